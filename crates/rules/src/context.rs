use std::collections::HashMap;

use lexmetric_core::{Money, Transaction};

use crate::config::EngineConfig;

const WALLET_KEYWORDS: [&str; 4] = ["venmo", "cashapp", "zelle", "paypal"];

/// Grouping key for a digital-wallet transfer, or `None` when the
/// description names no wallet service.
///
/// Venmo descriptions carry a handle right after the service name; the
/// other services are lumped into one bucket each.
pub fn recipient_key(description: &str) -> Option<String> {
    let lower = description.to_lowercase();
    if !WALLET_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }

    let key = if lower.contains("venmo") {
        venmo_handle(&lower).unwrap_or("unknown-venmo").to_string()
    } else if lower.contains("cashapp") {
        "cashapp-user".to_string()
    } else if lower.contains("zelle") {
        "zelle-user".to_string()
    } else {
        "general-digital-wallet".to_string()
    };
    Some(key)
}

re!(re_venmo_handle, r"venmo\s+(\S+)");

/// The token after the first `venmo` that is followed by whitespace.
fn venmo_handle(lower: &str) -> Option<&str> {
    re_venmo_handle()
        .captures(lower)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Running total of wallet transfers attributed to one recipient key.
#[derive(Debug)]
pub struct RecipientGroup<'a> {
    pub key: String,
    /// Sum of absolute amounts.
    pub total: Money,
    /// Contributing transactions, in encounter order.
    pub transactions: Vec<&'a Transaction>,
}

/// Cross-transaction facts computed once per engine run.
///
/// Built fresh inside every run and dropped afterwards; nothing here outlives
/// the call.
#[derive(Debug)]
pub struct AggregateContext<'a> {
    pub config: &'a EngineConfig,
    /// Recipient groups in first-encounter order.
    pub recipients: Vec<RecipientGroup<'a>>,
}

impl<'a> AggregateContext<'a> {
    pub fn build(transactions: &'a [Transaction], config: &'a EngineConfig) -> Self {
        let mut recipients: Vec<RecipientGroup<'a>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for tx in transactions {
            let Some(key) = recipient_key(&tx.description) else {
                continue;
            };
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                recipients.push(RecipientGroup {
                    key,
                    total: Money::zero(),
                    transactions: Vec::new(),
                });
                recipients.len() - 1
            });
            let group = &mut recipients[slot];
            group.total = group.total + tx.amount.abs();
            group.transactions.push(tx);
        }

        Self { config, recipients }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(desc: &str, cents: i64) -> Transaction {
        Transaction::new("01/01/2025", desc, Money::from_cents(cents), "s.txt", 1)
    }

    #[test]
    fn venmo_takes_following_token() {
        assert_eq!(recipient_key("VENMO bob").as_deref(), Some("bob"));
        assert_eq!(recipient_key("Payment venmo   @Jane-D memo").as_deref(), Some("@jane-d"));
        assert_eq!(
            recipient_key("VENMO PAYMENT TO @JOHNNY-B-GOOD").as_deref(),
            Some("payment")
        );
    }

    #[test]
    fn venmo_without_handle_falls_back() {
        assert_eq!(recipient_key("VENMO").as_deref(), Some("unknown-venmo"));
        assert_eq!(recipient_key("venmo   ").as_deref(), Some("unknown-venmo"));
        assert_eq!(recipient_key("VENMO*BOB").as_deref(), Some("unknown-venmo"));
        // A later `venmo` followed by a handle still counts.
        assert_eq!(recipient_key("VENMO*CASHOUT venmo ann").as_deref(), Some("ann"));
    }

    #[test]
    fn fixed_keys_for_other_wallets() {
        assert_eq!(recipient_key("CASHAPP*JOE").as_deref(), Some("cashapp-user"));
        assert_eq!(recipient_key("Zelle to Mom").as_deref(), Some("zelle-user"));
        assert_eq!(recipient_key("PAYPAL *EBAY").as_deref(), Some("general-digital-wallet"));
    }

    #[test]
    fn venmo_wins_over_other_services() {
        assert_eq!(recipient_key("zelle refund via venmo sam").as_deref(), Some("sam"));
        assert_eq!(recipient_key("paypal zelle").as_deref(), Some("zelle-user"));
    }

    #[test]
    fn non_wallet_has_no_key() {
        assert_eq!(recipient_key("GROCERY OUTLET"), None);
        assert_eq!(recipient_key(""), None);
    }

    #[test]
    fn groups_sum_absolute_amounts_in_encounter_order() {
        let txs = vec![
            tx("ZELLE TO SISTER", -20_000),
            tx("VENMO bob", -30_000),
            tx("GROCERY", -5_000),
            tx("VENMO bob refund", 10_000),
            tx("ZELLE FROM SISTER", 5_000),
        ];
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&txs, &config);

        let keys: Vec<&str> = ctx.recipients.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["zelle-user", "bob"]);

        let group = |key: &str| ctx.recipients.iter().find(|g| g.key == key).unwrap();
        let bob = group("bob");
        assert_eq!(bob.total, Money::dollars(400));
        assert_eq!(bob.transactions.len(), 2);
        assert_eq!(bob.transactions[0].id, txs[1].id);

        assert_eq!(group("zelle-user").total, Money::dollars(250));
    }

    #[test]
    fn empty_set_has_no_groups() {
        let config = EngineConfig::default();
        assert!(AggregateContext::build(&[], &config).recipients.is_empty());
    }
}
