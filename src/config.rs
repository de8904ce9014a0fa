//! # Configuration
//!
//! Layered configuration for steward-core: compiled defaults, an optional
//! config file, then environment overrides (prefix `STEWARD`, `__` separator).
//! Explicit validation, no silent fallbacks.
//!
//! ```rust,no_run
//! use steward_core::config::StewardConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StewardConfig::load()?;
//! assert!(config.validation.max_depth > 0);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StewardError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for validation and orchestration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StewardConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub events: EventConfig,
}

/// Validator tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Cap on schema nesting depth while walking a candidate
    pub max_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// Orchestrator tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Steps slower than this are logged as slow
    pub step_warn_threshold_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            step_warn_threshold_ms: 1000,
        }
    }
}

/// Event publisher tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast channel capacity for lifecycle events
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

impl StewardConfig {
    /// Load configuration from defaults, `config/steward.{toml,yaml,json}` if
    /// present, and `STEWARD_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::build(config::File::with_name("config/steward").required(false))
    }

    /// Load configuration with an explicit config file
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::build(config::File::from(path).required(true))
    }

    fn build(file: config::File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let defaults = config::Config::try_from(&StewardConfig::default())
            .map_err(|e| StewardError::configuration(e.to_string()))?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(config::Environment::with_prefix("STEWARD").separator("__"))
            .build()
            .map_err(|e| StewardError::configuration(e.to_string()))?;
        let config: StewardConfig = settings
            .try_deserialize()
            .map_err(|e| StewardError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would wedge validation or event delivery
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_depth == 0 {
            return Err(StewardError::configuration(
                "validation.max_depth must be greater than zero",
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(StewardError::configuration(
                "events.channel_capacity must be greater than zero",
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
    fn test_defaults() {
        let config = StewardConfig::default();
        assert_eq!(config.validation.max_depth, 10);
        assert_eq!(config.orchestration.step_warn_threshold_ms, 1000);
        assert_eq!(config.events.channel_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = StewardConfig {
            validation: ValidationConfig { max_depth: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_applies() {
        // step_warn_threshold_ms is not asserted by the other layering tests,
        // so this cannot race them on the process environment
        std::env::set_var("STEWARD__ORCHESTRATION__STEP_WARN_THRESHOLD_MS", "250");
        let config = StewardConfig::load().unwrap();
        std::env::remove_var("STEWARD__ORCHESTRATION__STEP_WARN_THRESHOLD_MS");

        assert_eq!(config.orchestration.step_warn_threshold_ms, 250);
        // untouched sections keep their defaults
        assert_eq!(config.validation.max_depth, 10);
    }

    #[test]
    fn test_file_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[validation]\nmax_depth = 4").unwrap();

        let config = StewardConfig::load_from(&path).unwrap();
        assert_eq!(config.validation.max_depth, 4);
        // untouched sections keep their defaults
        assert_eq!(config.events.channel_capacity, 1000);
    }
}
