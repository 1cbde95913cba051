use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::flag::{AuditFlag, FlagStatus, RuleId};
use crate::id::TransactionId;
use crate::money::Money;
use crate::transaction::Transaction;

/// Roll-up of a session's findings, priced against a penalty divisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub transaction_count: usize,
    pub flag_count: usize,
    /// Flags still pending or confirmed.
    pub open_flag_count: usize,
    pub by_rule: BTreeMap<RuleId, usize>,
    /// Sum of |amount| over transactions carrying at least one open flag.
    pub total_exposure: Money,
    pub divisor: Money,
    pub penalty_period_months: Decimal,
}

impl AuditSummary {
    pub fn compute(transactions: &[Transaction], flags: &[AuditFlag], divisor: Money) -> Self {
        let mut by_rule = BTreeMap::new();
        for flag in flags {
            *by_rule.entry(flag.rule_id).or_insert(0) += 1;
        }

        let open: Vec<&AuditFlag> = flags
            .iter()
            .filter(|f| f.status.counts_toward_exposure())
            .collect();

        // A transaction with several open flags is only exposed once.
        let exposed: HashSet<TransactionId> = open.iter().map(|f| f.transaction_id).collect();
        let by_id: HashMap<TransactionId, &Transaction> =
            transactions.iter().map(|t| (t.id, t)).collect();
        let total_exposure: Money = exposed
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|t| t.amount.abs())
            .sum();

        let penalty_period_months = if divisor.as_decimal() > Decimal::ZERO {
            total_exposure
                .as_decimal()
                .checked_div(divisor.as_decimal())
                .map(|m| m.round_dp(2))
                .unwrap_or(Decimal::MAX)
        } else {
            Decimal::ZERO
        };

        AuditSummary {
            transaction_count: transactions.len(),
            flag_count: flags.len(),
            open_flag_count: open.len(),
            by_rule,
            total_exposure,
            divisor,
            penalty_period_months,
        }
    }

    pub fn count_for(&self, rule: RuleId) -> usize {
        self.by_rule.get(&rule).copied().unwrap_or(0)
    }
}

/// Flags that still need a reviewer decision.
pub fn pending_flags(flags: &[AuditFlag]) -> impl Iterator<Item = &AuditFlag> {
    flags.iter().filter(|f| f.status == FlagStatus::Pending)
}
