//! Resolver configuration
//!
//! Handles configuration defaults, file loading, and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How resolution ticks are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Ticks run on a spawned worker task with backoff delays between them.
    Deferred,
    /// Every scheduling request runs a full tick synchronously in-line.
    Immediate,
}

impl Default for ScheduleMode {
    fn default() -> Self {
        Self::Deferred
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Scheduling mode
    #[serde(default)]
    pub mode: ScheduleMode,

    /// Base unit for the Fibonacci backoff between deferred ticks, in ms
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Failed attempts before a starved record escalates to acquisition
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: u32,

    /// Cap on fixed-point passes within one tick
    #[serde(default = "default_max_passes_per_tick")]
    pub max_passes_per_tick: u32,

    /// Prefix joined onto keys when deriving acquisition resource ids
    #[serde(default)]
    pub source_root: String,

    /// Extension appended to derived resource ids when absent
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Cache-busting token passed through to acquisition collaborators
    #[serde(default)]
    pub cache_token: Option<String>,
}

fn default_backoff_unit_ms() -> u64 {
    100
}

fn default_fail_threshold() -> u32 {
    3
}

fn default_max_passes_per_tick() -> u32 {
    32
}

fn default_source_extension() -> String {
    "js".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::default(),
            backoff_unit_ms: default_backoff_unit_ms(),
            fail_threshold: default_fail_threshold(),
            max_passes_per_tick: default_max_passes_per_tick(),
            source_root: String::new(),
            source_extension: default_source_extension(),
            cache_token: None,
        }
    }
}

impl ResolverConfig {
    /// Shorthand for an immediate-mode configuration.
    pub fn immediate() -> Self {
        Self {
            mode: ScheduleMode::Immediate,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backoff_unit_ms == 0 {
            anyhow::bail!("backoff_unit_ms must be at least 1");
        }
        if self.max_passes_per_tick == 0 {
            anyhow::bail!("max_passes_per_tick must be at least 1");
        }
        Ok(())
    }

    /// The backoff base unit as a duration.
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = ResolverConfig::default();
        assert_eq!(config.mode, ScheduleMode::Deferred);
        assert_eq!(config.backoff_unit_ms, 100);
        assert_eq!(config.fail_threshold, 3);
        assert_eq!(config.max_passes_per_tick, 32);
        assert_eq!(config.source_root, "");
        assert_eq!(config.source_extension, "js");
        assert_eq!(config.cache_token, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: ResolverConfig = toml::from_str(
            r#"
            mode = "immediate"
            source_root = "static/modules/"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, ScheduleMode::Immediate);
        assert_eq!(config.source_root, "static/modules/");
        assert_eq!(config.backoff_unit_ms, 100);
        assert_eq!(config.source_extension, "js");
    }

    #[test]
    fn cache_token_round_trips_through_toml() {
        let mut config = ResolverConfig::default();
        config.cache_token = Some("20260814".to_string());
        let text = toml::to_string(&config).unwrap();
        let back: ResolverConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.cache_token.as_deref(), Some("20260814"));
    }

    #[test]
    fn zero_backoff_unit_fails_validation() {
        let mut config = ResolverConfig::default();
        config.backoff_unit_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_pass_cap_fails_validation() {
        let mut config = ResolverConfig::default();
        config.max_passes_per_tick = 0;
        assert!(config.validate().is_err());
    }
}
