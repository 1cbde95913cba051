use lexmetric_core::{Money, RuleId, Transaction};

use crate::context::AggregateContext;

/// A rule that needs the whole transaction set before it can decide.
pub trait AggregateRule: Send + Sync {
    fn id(&self) -> RuleId;

    /// Matched transactions with the per-flag description, in emission order.
    fn evaluate<'a>(&self, ctx: &AggregateContext<'a>) -> Vec<(&'a Transaction, String)>;
}

/// A rule decided one transaction at a time.
pub trait TransactionRule: Send + Sync {
    fn id(&self) -> RuleId;

    /// `Some(description)` when the transaction trips the rule.
    fn evaluate(&self, tx: &Transaction, ctx: &AggregateContext<'_>) -> Option<String>;
}

/// The stock per-transaction battery, in evaluation order.
pub fn standard_rules() -> Vec<Box<dyn TransactionRule>> {
    vec![
        Box::new(SmurfCash),
        Box::new(TitheTrap),
        Box::new(RoundNumber),
        Box::new(GhostAsset),
    ]
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

// ── DIGITAL_ALLOWANCE ─────────────────────────────────────────────────────────

/// Repeated wallet transfers to one recipient that add up past the
/// configured threshold. Every contributing transaction is flagged, not just
/// the one that crossed the line.
pub struct DigitalAllowance;

impl AggregateRule for DigitalAllowance {
    fn id(&self) -> RuleId {
        RuleId::DigitalAllowance
    }

    fn evaluate<'a>(&self, ctx: &AggregateContext<'a>) -> Vec<(&'a Transaction, String)> {
        let threshold = ctx.config.digital_allowance_threshold;
        ctx.recipients
            .iter()
            .filter(|g| g.total > threshold)
            .flat_map(|g| {
                let description = format!(
                    "Cumulative transfers to {} exceed {} ({})",
                    g.key,
                    threshold.trimmed(),
                    g.total
                );
                g.transactions.iter().map(move |tx| (*tx, description.clone()))
            })
            .collect()
    }
}

// ── SMURF_CASH ────────────────────────────────────────────────────────────────

pub struct SmurfCash;

impl SmurfCash {
    const KEYWORDS: [&'static str; 3] = ["atm", "cash", "teller"];

    fn limit() -> Money {
        Money::dollars(400)
    }
}

impl TransactionRule for SmurfCash {
    fn id(&self) -> RuleId {
        RuleId::SmurfCash
    }

    fn evaluate(&self, tx: &Transaction, _ctx: &AggregateContext<'_>) -> Option<String> {
        let desc = tx.description.to_lowercase();
        let abs = tx.amount.abs();
        (contains_any(&desc, &Self::KEYWORDS) && abs > Self::limit())
            .then(|| format!("Large cash withdrawal of {abs} detected."))
    }
}

// ── TITHE_TRAP ────────────────────────────────────────────────────────────────

re!(re_charity, r"church|synagogue|ministry|charity|donation|gofundme");

/// Charitable giving is a transfer for less than fair value, whatever the amount.
pub struct TitheTrap;

impl TransactionRule for TitheTrap {
    fn id(&self) -> RuleId {
        RuleId::TitheTrap
    }

    fn evaluate(&self, tx: &Transaction, _ctx: &AggregateContext<'_>) -> Option<String> {
        re_charity()
            .is_match(&tx.description.to_lowercase())
            .then(|| format!("Donation detected: {}", tx.description))
    }
}

// ── ROUND_NUMBER ──────────────────────────────────────────────────────────────

pub struct RoundNumber;

impl RoundNumber {
    const EXCLUDED: [&'static str; 2] = ["atm", "transfer"];
}

impl TransactionRule for RoundNumber {
    fn id(&self) -> RuleId {
        RuleId::RoundNumber
    }

    fn evaluate(&self, tx: &Transaction, _ctx: &AggregateContext<'_>) -> Option<String> {
        let desc = tx.description.to_lowercase();
        let abs = tx.amount.abs();
        let round = abs > Money::dollars(100) && abs.is_multiple_of(Money::dollars(50));
        (round && !contains_any(&desc, &Self::EXCLUDED))
            .then(|| format!("Round number payment ({}) detected.", abs.trimmed()))
    }
}

// ── GHOST_ASSET ───────────────────────────────────────────────────────────────

/// Transfers that look like they land in an account the client never
/// disclosed. Any `x` in the description counts as a masked account number,
/// which makes this deliberately broad.
pub struct GhostAsset;

impl GhostAsset {
    const KEYWORDS: [&'static str; 3] = ["transfer", "xfer", "online banking"];
}

impl TransactionRule for GhostAsset {
    fn id(&self) -> RuleId {
        RuleId::GhostAsset
    }

    fn evaluate(&self, tx: &Transaction, _ctx: &AggregateContext<'_>) -> Option<String> {
        let desc = tx.description.to_lowercase();
        (contains_any(&desc, &Self::KEYWORDS) && desc.contains('x'))
            .then(|| format!("Transfer to potential external account: {}", tx.description))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn tx(desc: &str, cents: i64) -> Transaction {
        Transaction::new("01/01/2025", desc, Money::from_cents(cents), "s.txt", 1)
    }

    fn fires(rule: &dyn TransactionRule, desc: &str, cents: i64) -> bool {
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&[], &config);
        rule.evaluate(&tx(desc, cents), &ctx).is_some()
    }

    // ── SMURF_CASH ────────────────────────────────────────────────────────────

    #[test]
    fn smurf_threshold_is_strict() {
        assert!(!fires(&SmurfCash, "ATM WITHDRAWAL", -40_000));
        assert!(fires(&SmurfCash, "ATM WITHDRAWAL", -40_001));
    }

    #[test]
    fn smurf_keywords() {
        assert!(fires(&SmurfCash, "CASH WITHDRAWAL", -49_000));
        assert!(fires(&SmurfCash, "Teller #4", -50_000));
        assert!(!fires(&SmurfCash, "CHECK #104", -50_000));
    }

    #[test]
    fn smurf_ignores_sign() {
        assert!(fires(&SmurfCash, "ATM DEPOSIT", 45_000));
    }

    #[test]
    fn smurf_description_shows_absolute_amount() {
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&[], &config);
        let d = SmurfCash.evaluate(&tx("ATM", -49_000), &ctx).unwrap();
        assert_eq!(d, "Large cash withdrawal of $490.00 detected.");
    }

    // ── TITHE_TRAP ────────────────────────────────────────────────────────────

    #[test]
    fn tithe_matches_regardless_of_amount() {
        assert!(fires(&TitheTrap, "ST. MARY'S CHURCH DONATION", -100));
        assert!(fires(&TitheTrap, "GoFundMe for Dave", -2_500));
        assert!(fires(&TitheTrap, "Temple Synagogue dues", 0));
        assert!(!fires(&TitheTrap, "GROCERY OUTLET", -10_000));
    }

    #[test]
    fn tithe_description_quotes_original_text() {
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&[], &config);
        let d = TitheTrap.evaluate(&tx("Red Cross Charity", -5_000), &ctx).unwrap();
        assert_eq!(d, "Donation detected: Red Cross Charity");
    }

    // ── ROUND_NUMBER ──────────────────────────────────────────────────────────

    #[test]
    fn round_number_basic() {
        assert!(fires(&RoundNumber, "Payment", -15_000));
        assert!(fires(&RoundNumber, "CHECK #105 SUSAN MILLER", -200_000));
    }

    #[test]
    fn round_number_excluded_keywords() {
        assert!(!fires(&RoundNumber, "Online Transfer", -15_000));
        assert!(!fires(&RoundNumber, "ATM WITHDRAWAL", -15_000));
    }

    #[test]
    fn round_number_bounds() {
        // 100 itself is not above the floor.
        assert!(!fires(&RoundNumber, "Payment", -10_000));
        assert!(!fires(&RoundNumber, "Payment", -12_500));
        assert!(!fires(&RoundNumber, "Payment", -15_001));
        assert!(fires(&RoundNumber, "Payment", 25_000));
    }

    #[test]
    fn round_number_description_uses_whole_dollars() {
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&[], &config);
        let d = RoundNumber.evaluate(&tx("Payment", -15_000), &ctx).unwrap();
        assert_eq!(d, "Round number payment ($150) detected.");
    }

    // ── GHOST_ASSET ───────────────────────────────────────────────────────────

    #[test]
    fn ghost_asset_masked_account() {
        assert!(fires(&GhostAsset, "ONLINE TRANSFER TO ACCT ...x9999", -1_500_000));
        assert!(fires(&GhostAsset, "XFER TO SAVINGS", -100));
    }

    #[test]
    fn ghost_asset_any_x_counts() {
        // "Online banking" plus the x in "Exxon" is enough.
        assert!(fires(&GhostAsset, "Online Banking Exxon", -100));
        assert!(!fires(&GhostAsset, "Online Transfer", -15_000));
        assert!(!fires(&GhostAsset, "ACCT x1234 PAYMENT", -100));
    }

    // ── DIGITAL_ALLOWANCE ─────────────────────────────────────────────────────

    #[test]
    fn digital_allowance_flags_every_contributor() {
        let txs = vec![tx("venmo bob", -30_000), tx("venmo bob", -30_000)];
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&txs, &config);
        let hits = DigitalAllowance.evaluate(&ctx);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.id, txs[0].id);
        assert_eq!(hits[0].1, "Cumulative transfers to bob exceed $500 ($600.00)");
    }

    #[test]
    fn digital_allowance_threshold_is_strict() {
        let txs = vec![tx("venmo bob", -25_000), tx("venmo bob", -25_000)];
        let config = EngineConfig::default();
        let ctx = AggregateContext::build(&txs, &config);
        assert!(DigitalAllowance.evaluate(&ctx).is_empty());
    }

    #[test]
    fn standard_rules_order() {
        let ids: Vec<RuleId> = standard_rules().iter().map(|r| r.id()).collect();
        assert_eq!(
            ids,
            vec![RuleId::SmurfCash, RuleId::TitheTrap, RuleId::RoundNumber, RuleId::GhostAsset]
        );
    }
}
