use serde::{Deserialize, Serialize};

use super::id::TransactionId;
use super::money::Money;

/// One ledger line recovered from a statement page.
///
/// `date` is the raw text that matched on the statement and is never parsed;
/// it is kept for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub date: String,
    pub description: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source_file: String,
    pub page_number: u32,
}

impl Transaction {
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        source_file: impl Into<String>,
        page_number: u32,
    ) -> Self {
        Transaction {
            id: TransactionId::new(),
            date: date.into(),
            description: description.into(),
            amount,
            category: None,
            source_file: source_file.into(),
            page_number,
        }
    }
}
