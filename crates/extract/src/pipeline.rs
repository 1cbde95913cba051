use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lexmetric_core::Transaction;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::extract::{Extractor, Page};
use crate::hash;
use crate::source::{PageSource, SourceError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Page source failed: {0}")]
    Source(#[from] SourceError),
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The result of running one statement file through the pipeline.
#[derive(Debug)]
pub struct IngestedFile {
    pub file_name: String,
    /// SHA-256 hex digest of the raw file, used to detect re-uploads.
    pub hash_hex: String,
    pub page_count: usize,
    /// Transactions from every page, in page then line order.
    pub transactions: Vec<Transaction>,
}

/// Orchestrates: hash → split into pages → extract each page.
pub struct StatementPipeline<S: PageSource> {
    source: S,
}

impl<S: PageSource> StatementPipeline<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<IngestedFile, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        self.process_bytes(&bytes, &file_name)
    }

    /// Process raw bytes (from an upload or a file read).
    pub fn process_bytes(&self, data: &[u8], file_name: &str) -> Result<IngestedFile, PipelineError> {
        let hash_hex = hash::content_hash(data);

        let pages: Vec<Page> = self
            .source
            .pages(data)?
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page::new(file_name, i as u32 + 1, text))
            .collect();

        let transactions = Extractor::extract_pages(&pages);

        tracing::info!(
            file_name,
            pages = pages.len(),
            transactions = transactions.len(),
            "Statement ingested"
        );

        Ok(IngestedFile {
            file_name: file_name.to_string(),
            hash_hex,
            page_count: pages.len(),
            transactions,
        })
    }
}

// ── Batch ingestion ───────────────────────────────────────────────────────────

/// Outcome of a batch, every list in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub files: Vec<IngestedFile>,
    /// Files whose content was already ingested (path, hash).
    pub duplicates: Vec<(PathBuf, String)>,
    pub failures: Vec<(PathBuf, PipelineError)>,
}

impl BatchOutcome {
    pub fn transaction_count(&self) -> usize {
        self.files.iter().map(|f| f.transactions.len()).sum()
    }

    /// All transactions of the accepted files, in input order.
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.files.into_iter().flat_map(|f| f.transactions).collect()
    }
}

/// Process `paths` concurrently and merge the results back into input order.
///
/// The returned outcome is complete: every spawned extraction has finished,
/// so rules may run over the merged transactions right away. Hashes in
/// `known_hashes`, and repeats within the batch, are reported as duplicates
/// and contribute no transactions.
pub async fn ingest_batch<S>(
    pipeline: Arc<StatementPipeline<S>>,
    paths: &[PathBuf],
    known_hashes: &HashSet<String>,
) -> Result<BatchOutcome, PipelineError>
where
    S: PageSource + 'static,
{
    let mut tasks = JoinSet::new();
    for (idx, path) in paths.iter().cloned().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move {
            let result = pipeline.process_file(&path).await;
            (idx, result)
        });
    }

    let mut slots: Vec<Option<Result<IngestedFile, PipelineError>>> =
        (0..paths.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined?;
        slots[idx] = Some(result);
    }

    let mut seen = known_hashes.clone();
    let mut outcome = BatchOutcome::default();
    for (path, slot) in paths.iter().zip(slots) {
        match slot {
            Some(Ok(file)) => {
                if seen.insert(file.hash_hex.clone()) {
                    outcome.files.push(file);
                } else {
                    tracing::warn!(path = %path.display(), hash = %file.hash_hex, "Skipping duplicate statement");
                    outcome.duplicates.push((path.clone(), file.hash_hex));
                }
            }
            Some(Err(e)) => {
                tracing::warn!(path = %path.display(), "Statement pipeline error: {e}");
                outcome.failures.push((path.clone(), e));
            }
            None => {}
        }
    }

    Ok(outcome)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
