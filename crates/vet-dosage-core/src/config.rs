//! Service configuration.
//!
//! TOML file with three optional sections; anything omitted takes its default.
//!
//! ```toml
//! [dataset]
//! path = "data/poultry_treatments.csv"
//! category = "Poultry"
//!
//! [database]
//! path = "vet_dosage.db"   # omit for an in-memory database
//!
//! [recommendation]
//! top_n = 3
//! fallback_treatment_days = 7
//! default_daily_frequency = 2
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::DEFAULT_CATEGORY;
use crate::engine::DEFAULT_FALLBACK_TREATMENT_DAYS;
use crate::models::{DEFAULT_DAILY_FREQUENCY, DEFAULT_TOP_N, MAX_TREATMENT_DAYS};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub dataset: DatasetConfig,
    pub database: DatabaseConfig,
    pub recommendation: RecommendationConfig,
}

/// Reference dataset location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Category the dataset's antibiotics are listed under
    pub category: String,
}

/// SQLite location; `None` means in-memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

/// Recommendation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendationConfig {
    pub top_n: usize,
    pub fallback_treatment_days: u32,
    pub default_daily_frequency: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/poultry_treatments.csv"),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            fallback_treatment_days: DEFAULT_FALLBACK_TREATMENT_DAYS,
            default_daily_frequency: DEFAULT_DAILY_FREQUENCY,
        }
    }
}

impl ServiceConfig {
    /// Load from a file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: ServiceConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dataset.category.trim().is_empty() {
            return Err(ConfigError::Invalid("dataset.category must not be empty".into()));
        }
        if self.recommendation.top_n == 0 {
            return Err(ConfigError::Invalid("recommendation.top_n must be at least 1".into()));
        }
        if self.recommendation.fallback_treatment_days == 0
            || self.recommendation.fallback_treatment_days > MAX_TREATMENT_DAYS
        {
            return Err(ConfigError::Invalid(format!(
                "recommendation.fallback_treatment_days must be between 1 and {}",
                MAX_TREATMENT_DAYS
            )));
        }
        if self.recommendation.default_daily_frequency == 0 {
            return Err(ConfigError::Invalid(
                "recommendation.default_daily_frequency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recommendation.top_n, 3);
        assert_eq!(config.recommendation.fallback_treatment_days, 7);
        assert_eq!(config.recommendation.default_daily_frequency, 2);
        assert_eq!(config.dataset.category, "Poultry");
        assert_eq!(config.database.path, None);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [dataset]
            path = "/srv/poultry.csv"

            [recommendation]
            top_n = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset.path, PathBuf::from("/srv/poultry.csv"));
        assert_eq!(config.dataset.category, "Poultry");
        assert_eq!(config.recommendation.top_n, 5);
        assert_eq!(config.recommendation.fallback_treatment_days, 7);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ServiceConfig::from_toml_str("").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml_str("[recommendation]\ntop_n = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("[recommendation]\nfallback_treatment_days = 400"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("[recommendation]\ndefault_daily_frequency = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            ServiceConfig::from_toml_str("[dataset\npath ="),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/tmp/vet.db\"").unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/vet.db")));

        assert!(matches!(
            ServiceConfig::load(Some(Path::new("/nonexistent/config.toml"))),
            Err(ConfigError::Io(_))
        ));
    }
}
