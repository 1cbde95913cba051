pub mod extract;
pub mod hash;
pub mod pipeline;
pub mod source;

pub use extract::{Extractor, Page};
pub use hash::{content_hash, sha256_bytes, to_hex};
pub use pipeline::{ingest_batch, BatchOutcome, IngestedFile, PipelineError, StatementPipeline};
pub use source::{DocumentSource, MockSource, PageSource, PlainTextSource, SourceError};
