use std::path::{Path, PathBuf};

use lexmetric_core::Money;
use lexmetric_rules::{ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to write settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Engine(#[from] ConfigError),
    #[error("Penalty divisor must not be negative (got {0})")]
    NegativeDivisor(Money),
}

/// User preferences persisted as `settings.toml` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Average monthly private-pay care cost used to turn exposure into
    /// penalty months.
    pub divisor: Money,
    pub default_state: String,
    /// Keep all processing local. Nothing leaves the machine today either way.
    pub strict_mode: bool,
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            divisor: Money::dollars(10_438),
            default_state: "FL".to_string(),
            strict_mode: false,
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Missing file means defaults.
    pub fn load(data_dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), SettingsError> {
        self.validate()?;
        std::fs::create_dir_all(data_dir)?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path(data_dir), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.divisor.is_negative() {
            return Err(SettingsError::NegativeDivisor(self.divisor));
        }
        self.engine.validate()?;
        Ok(())
    }
}
