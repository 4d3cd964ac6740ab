//! Configuration file support for the coach.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/coach/config.toml`.

use crate::{Error, Profile, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub profile: Profile,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Optional catalog JSON replacing the built-in exercises
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_path: None,
        }
    }
}

/// Session engine tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds per expected rep for advisory pacing in rep mode
    #[serde(default = "default_rep_cadence_seconds")]
    pub rep_cadence_seconds: u32,

    /// Write the session snapshot on every tick, not only on transitions
    #[serde(default = "default_persist_every_tick")]
    pub persist_every_tick: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rep_cadence_seconds: default_rep_cadence_seconds(),
            persist_every_tick: default_persist_every_tick(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("coach")
}

fn default_rep_cadence_seconds() -> u32 {
    3
}

fn default_persist_every_tick() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("coach").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.session.rep_cadence_seconds == 0 {
            return Err(Error::Config(
                "session.rep_cadence_seconds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FitnessLevel, Goal};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.rep_cadence_seconds, 3);
        assert!(config.session.persist_every_tick);
        assert!(config.data.catalog_path.is_none());
        assert_eq!(config.profile.user_id, "local");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.session.rep_cadence_seconds,
            parsed.session.rep_cadence_seconds
        );
        assert_eq!(config.profile, parsed.profile);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[profile]
fitnessLevel = "intermediate"
goal = "weightLoss"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.profile.fitness_level, FitnessLevel::Intermediate);
        assert_eq!(config.profile.goal, Goal::WeightLoss);
        assert_eq!(config.session.rep_cadence_seconds, 3); // default
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nrep_cadence_seconds = 0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.rep_cadence_seconds = 4;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.session.rep_cadence_seconds, 4);
    }
}
