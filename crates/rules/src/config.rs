use lexmetric_core::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Digital allowance threshold must not be negative (got {0})")]
    NegativeThreshold(Money),
}

/// Tunables of the rule engine. Defaults reproduce the stock behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cumulative wallet transfers to one recipient must strictly exceed this.
    pub digital_allowance_threshold: Money,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            digital_allowance_threshold: Money::dollars(500),
        }
    }
}

impl EngineConfig {
    pub fn with_threshold(threshold: Money) -> Result<Self, ConfigError> {
        let config = Self { digital_allowance_threshold: threshold };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.digital_allowance_threshold.is_negative() {
            return Err(ConfigError::NegativeThreshold(self.digital_allowance_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_500() {
        assert_eq!(EngineConfig::default().digital_allowance_threshold, Money::dollars(500));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn threshold_from_toml_string() {
        let cfg = EngineConfig::from_toml(r#"digital_allowance_threshold = "750.00""#).unwrap();
        assert_eq!(cfg.digital_allowance_threshold, Money::dollars(750));
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(matches!(
            EngineConfig::from_toml(r#"digital_allowance_threshold = "-1""#),
            Err(ConfigError::NegativeThreshold(_))
        ));
        assert!(EngineConfig::with_threshold(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml("digital_allowance_threshold = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
