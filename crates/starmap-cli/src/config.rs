//! CLI configuration.
//!
//! Values are read from, in order of preference:
//! - a TOML file (`$STARMAP_CONFIG`, default `~/.config/starmap/config.toml`)
//! - environment variables (`STARMAP_*` prefixed)
//! - built-in defaults
//!
//! Command-line flags override whatever was loaded.
//!
//! ```toml
//! [fusion]
//! min_relation = 0.4
//! max_level = 4
//! layout_seed = 42
//! contributor = "alice"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use starmap_core::defaults;
use starmap_fusion::AnalysisOptions;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables shared by the `analyze` and `fuse` commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarmapConfig {
    /// Minimum relation strength kept by analysis and synthesis.
    pub min_relation: f64,
    /// Number of hierarchy levels assigned by analysis.
    pub max_level: u32,
    /// Seed for positions of nodes that arrive without one.
    pub layout_seed: u64,
    /// Contributor credited when a request names none.
    pub contributor: String,
}

impl Default for StarmapConfig {
    fn default() -> Self {
        Self {
            min_relation: defaults::MIN_RELATION,
            max_level: defaults::MAX_LEVEL,
            layout_seed: defaults::LAYOUT_SEED,
            contributor: defaults::CONTRIBUTOR.to_string(),
        }
    }
}

impl StarmapConfig {
    /// Returns `$STARMAP_CONFIG` if set, else ~/.config/starmap/config.toml
    pub fn default_config_path() -> PathBuf {
        if let Ok(path) = env::var("STARMAP_CONFIG") {
            return PathBuf::from(path);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("starmap");
        path.push("config.toml");
        path
    }

    /// Load from the default path, falling back to environment variables.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::default_config_path();

        if path.exists() {
            info!("Loading starmap config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            let config = Self::from_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load from a TOML file with a `[fusion]` table. Missing keys keep
    /// their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;

        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            fusion: StarmapConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.fusion.validate()?;
        Ok(root.fusion)
    }

    /// Load from environment variables. Unset or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            min_relation: env::var("STARMAP_MIN_RELATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.min_relation),
            max_level: env::var("STARMAP_MAX_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_level),
            layout_seed: env::var("STARMAP_LAYOUT_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.layout_seed),
            contributor: env::var("STARMAP_CONTRIBUTOR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.contributor),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.min_relation.is_finite() || !(0.0..=1.0).contains(&self.min_relation) {
            return Err(ConfigError::Validation(format!(
                "min_relation must be within [0, 1], got {}",
                self.min_relation
            )));
        }
        if self.max_level == 0 {
            return Err(ConfigError::Validation(
                "max_level must be >= 1".to_string(),
            ));
        }
        if self.contributor.trim().is_empty() {
            return Err(ConfigError::Validation(
                "contributor must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            min_relation: self.min_relation,
            max_level: self.max_level,
            contributor: self.contributor.clone(),
            layout_seed: self.layout_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = StarmapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_relation, 0.3);
        assert_eq!(config.max_level, 3);
        assert_eq!(config.contributor, "anonymous");
    }

    #[test]
    fn test_from_file_reads_fusion_table() {
        let file = write_config(
            r#"
[fusion]
min_relation = 0.4
max_level = 5
contributor = "alice"
"#,
        );
        let config = StarmapConfig::from_file(file.path()).unwrap();
        assert_eq!(config.min_relation, 0.4);
        assert_eq!(config.max_level, 5);
        assert_eq!(config.contributor, "alice");
        assert_eq!(config.layout_seed, defaults::LAYOUT_SEED);
    }

    #[test]
    fn test_from_file_without_table_uses_defaults() {
        let file = write_config("# nothing configured\n");
        let config = StarmapConfig::from_file(file.path()).unwrap();
        assert_eq!(config, StarmapConfig::default());
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let file = write_config("[fusion]\nmin_relation = 1.5\n");
        let err = StarmapConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let file = write_config("[fusion\nmin_relation = ");
        let err = StarmapConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_from_file_missing_file() {
        let err = StarmapConfig::from_file(Path::new("/nonexistent/starmap.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("STARMAP_MAX_LEVEL", "7");
        env::set_var("STARMAP_CONTRIBUTOR", "bob");
        let config = StarmapConfig::from_env();
        env::remove_var("STARMAP_MAX_LEVEL");
        env::remove_var("STARMAP_CONTRIBUTOR");

        assert_eq!(config.max_level, 7);
        assert_eq!(config.contributor, "bob");
    }

    #[test]
    fn test_validate_rejects_zero_levels() {
        let config = StarmapConfig {
            max_level: 0,
            ..StarmapConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analysis_options_carry_values() {
        let config = StarmapConfig {
            min_relation: 0.5,
            contributor: "carol".to_string(),
            ..StarmapConfig::default()
        };
        let options = config.analysis_options();
        assert_eq!(options.min_relation, 0.5);
        assert_eq!(options.contributor, "carol");
    }
}
