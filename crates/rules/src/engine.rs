use lexmetric_core::{AuditFlag, Transaction};

use crate::config::EngineConfig;
use crate::context::AggregateContext;
use crate::rules::{standard_rules, AggregateRule, DigitalAllowance, TransactionRule};

/// Runs the detection battery over a complete transaction set.
///
/// Every call builds its aggregation state from scratch and returns a brand
/// new flag set; nothing from an earlier run is consulted. The caller must
/// pass the full set, since aggregate rules only see what they are given.
pub struct RuleEngine {
    config: EngineConfig,
    aggregate_rules: Vec<Box<dyn AggregateRule>>,
    rules: Vec<Box<dyn TransactionRule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rules(config, vec![Box::new(DigitalAllowance)], standard_rules())
    }

    pub fn with_rules(
        config: EngineConfig,
        aggregate_rules: Vec<Box<dyn AggregateRule>>,
        rules: Vec<Box<dyn TransactionRule>>,
    ) -> Self {
        Self { config, aggregate_rules, rules }
    }

    /// Aggregate rules first (recipient by recipient), then the
    /// per-transaction rules in transaction order.
    pub fn run(&self, transactions: &[Transaction]) -> Vec<AuditFlag> {
        let ctx = AggregateContext::build(transactions, &self.config);
        let mut flags = Vec::new();

        for rule in &self.aggregate_rules {
            for (tx, description) in rule.evaluate(&ctx) {
                flags.push(AuditFlag::pending(tx.id, rule.id(), description));
            }
        }

        for tx in transactions {
            for rule in &self.rules {
                if let Some(description) = rule.evaluate(tx, &ctx) {
                    flags.push(AuditFlag::pending(tx.id, rule.id(), description));
                }
            }
        }

        tracing::info!(
            transactions = transactions.len(),
            flags = flags.len(),
            recipients = ctx.recipients.len(),
            "Rule engine run complete"
        );
        flags
    }
}
