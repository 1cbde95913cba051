use std::collections::HashMap;

use lexmetric_core::{AuditFlag, RuleId, TransactionId};

/// Carry caseworker decisions from an earlier flag set onto a fresh one.
///
/// Flags are matched on `(transaction_id, rule_id)`. Only reviewed flags are
/// carried; fresh flags with no counterpart stay pending, and previous flags
/// whose rule no longer fires are dropped. Returns how many fresh flags took
/// over a review.
pub fn reconcile_reviews(previous: &[AuditFlag], fresh: &mut [AuditFlag]) -> usize {
    let reviewed: HashMap<(TransactionId, RuleId), &AuditFlag> = previous
        .iter()
        .filter(|f| f.is_reviewed())
        .map(|f| ((f.transaction_id, f.rule_id), f))
        .collect();

    if reviewed.is_empty() {
        return 0;
    }

    let mut carried = 0;
    for flag in fresh.iter_mut() {
        if let Some(old) = reviewed.get(&(flag.transaction_id, flag.rule_id)) {
            flag.status = old.status;
            flag.notes = old.notes.clone();
            carried += 1;
        }
    }

    tracing::debug!(carried, previous = previous.len(), fresh = fresh.len(), "Reviews reconciled");
    carried
}
