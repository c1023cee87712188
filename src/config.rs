//! Configuration for SymptomBuddy
//!
//! TOML file, default location `~/.symptombuddy/config.toml`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub gating: GatingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recommendation score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub match_weight: f64,
    pub effectiveness_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_weight: 0.6,
            effectiveness_weight: 0.4,
        }
    }
}

/// Insufficient-data gate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatingConfig {
    /// Logs shown as the target in "N of ~M logs" progress strings
    pub minimum_needed: u32,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self { minimum_needed: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one memory file per user
    pub data_dir: PathBuf,
    /// Persist after every mutation
    pub auto_save: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".symptombuddy")
            .join("memory");

        Self {
            data_dir,
            auto_save: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".symptombuddy").join("config.toml"))
    }

    /// Reject weights and thresholds the scorer and gate cannot use
    pub fn validate(&self) -> Result<()> {
        let ScoringConfig {
            match_weight,
            effectiveness_weight,
        } = self.scoring;

        for (name, weight) in [("match_weight", match_weight), ("effectiveness_weight", effectiveness_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                bail!("scoring.{} must be a non-negative number, got {}", name, weight);
            }
        }
        if match_weight + effectiveness_weight <= 0.0 {
            bail!("scoring weights must not both be zero");
        }
        if self.gating.minimum_needed == 0 {
            bail!("gating.minimum_needed must be at least 1");
        }

        Ok(())
    }
}
