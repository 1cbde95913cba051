pub mod flag;
pub mod id;
pub mod money;
pub mod session;
pub mod summary;
pub mod transaction;

pub use flag::{review, AuditFlag, FlagStatus, ReviewError, RiskLevel, RuleId};
pub use id::{FlagId, SessionId, TransactionId};
pub use money::Money;
pub use session::{AuditSession, SessionStatus};
pub use summary::{pending_flags, AuditSummary};
pub use transaction::Transaction;
