use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flag::AuditFlag;
use crate::id::SessionId;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Draft,
    Reviewed,
    Final,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Draft => write!(f, "DRAFT"),
            SessionStatus::Reviewed => write!(f, "REVIEWED"),
            SessionStatus::Final => write!(f, "FINAL"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(SessionStatus::Draft),
            "REVIEWED" => Ok(SessionStatus::Reviewed),
            "FINAL" => Ok(SessionStatus::Final),
            other => Err(format!("Unknown session status: '{other}'")),
        }
    }
}

/// One client's lookback audit: every transaction ingested so far and the
/// flags from the most recent engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSession {
    pub id: SessionId,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub transactions: Vec<Transaction>,
    pub flags: Vec<AuditFlag>,
    /// Content hashes of statement files already ingested.
    #[serde(default)]
    pub ingested_hashes: Vec<String>,
}

impl AuditSession {
    pub fn new(client_name: impl Into<String>) -> Self {
        let now = Utc::now();
        AuditSession {
            id: SessionId::new(),
            client_name: client_name.into(),
            created_at: now,
            updated_at: now,
            status: SessionStatus::Draft,
            transactions: Vec::new(),
            flags: Vec::new(),
            ingested_hashes: Vec::new(),
        }
    }

    pub fn append_transactions(&mut self, transactions: impl IntoIterator<Item = Transaction>) {
        self.transactions.extend(transactions);
        self.touch();
    }

    /// Swap in a freshly generated flag set; the old one is dropped whole.
    pub fn replace_flags(&mut self, flags: Vec<AuditFlag>) {
        self.flags = flags;
        self.touch();
    }

    /// Returns `false` when the hash was already recorded.
    pub fn record_hash(&mut self, hash_hex: impl Into<String>) -> bool {
        let hash_hex = hash_hex.into();
        if self.has_hash(&hash_hex) {
            return false;
        }
        self.ingested_hashes.push(hash_hex);
        true
    }

    pub fn has_hash(&self, hash_hex: &str) -> bool {
        self.ingested_hashes.iter().any(|h| h == hash_hex)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::RuleId;
    use crate::money::Money;

    #[test]
    fn new_session_is_empty_draft() {
        let s = AuditSession::new("Jane Doe");
        assert_eq!(s.status, SessionStatus::Draft);
        assert!(s.transactions.is_empty());
        assert!(s.flags.is_empty());
        assert_eq!(s.created_at, s.updated_at);
    }

    #[test]
    fn append_keeps_order_and_resolves_ids() {
        let mut s = AuditSession::new("Client");
        let a = Transaction::new("01/01/2025", "A", Money::from_cents(-100), "f", 1);
        let b = Transaction::new("01/02/2025", "B", Money::from_cents(-200), "f", 1);
        let b_id = b.id;
        s.append_transactions(vec![a, b]);
        assert_eq!(s.transactions[0].description, "A");
        assert_eq!(s.transactions[1].id, b_id);
        assert!(s.updated_at >= s.created_at);
    }

    #[test]
    fn replace_flags_discards_previous() {
        let mut s = AuditSession::new("Client");
        let tx = Transaction::new("01/01/2025", "CHURCH", Money::from_cents(-100), "f", 1);
        s.replace_flags(vec![AuditFlag::pending(tx.id, RuleId::TitheTrap, String::new())]);
        s.replace_flags(Vec::new());
        assert!(s.flags.is_empty());
    }

    #[test]
    fn record_hash_rejects_duplicates() {
        let mut s = AuditSession::new("Client");
        assert!(s.record_hash("abc"));
        assert!(!s.record_hash("abc"));
        assert!(s.has_hash("abc"));
    }

    #[test]
    fn status_roundtrip() {
        use std::str::FromStr;
        for st in [SessionStatus::Draft, SessionStatus::Reviewed, SessionStatus::Final] {
            assert_eq!(SessionStatus::from_str(&st.to_string()).unwrap(), st);
        }
    }
}
