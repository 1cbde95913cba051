macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod config;
pub mod context;
pub mod engine;
pub mod reconcile;
pub mod rules;

pub use config::{ConfigError, EngineConfig};
pub use context::{recipient_key, AggregateContext, RecipientGroup};
pub use engine::RuleEngine;
pub use reconcile::reconcile_reviews;
pub use rules::{
    standard_rules, AggregateRule, DigitalAllowance, GhostAsset, RoundNumber, SmurfCash,
    TitheTrap, TransactionRule,
};
