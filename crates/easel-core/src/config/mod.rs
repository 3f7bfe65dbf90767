//! Engine configuration.
//!
//! `EngineConfig` carries the thresholds, timers and strategy tables used by
//! the analyzer, executor and scheduler. Values can be overridden from
//! `EASEL_*` environment variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::StrategyCatalog;
use crate::util::normalize_text_option;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// When `false` every conflict waits for a human decision
    pub automatic_resolution_enabled: bool,
    /// Unresolved conflicts older than this are evicted by the sweeper
    pub conflict_timeout_ms: u64,
    /// Queue drainer period
    pub queue_tick_ms: u64,
    /// Expiry sweeper period
    pub expiry_tick_ms: u64,
    /// Recommendations below this confidence go to manual intervention
    pub manual_confidence_threshold: f64,
    /// Alternatives at or below this confidence are never retried
    pub alternative_confidence_threshold: f64,
    /// Audit entries kept in memory; older entries are dropped first
    pub history_limit: usize,
    pub catalog: StrategyCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            automatic_resolution_enabled: true,
            conflict_timeout_ms: 300_000,
            queue_tick_ms: 1_000,
            expiry_tick_ms: 60_000,
            manual_confidence_threshold: 0.7,
            alternative_confidence_threshold: 0.5,
            history_limit: 10_000,
            catalog: StrategyCatalog::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let automatic_resolution_enabled = match optional_trimmed(&lookup, "EASEL_AUTO_RESOLVE")
        {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                ConfigError::Invalid("EASEL_AUTO_RESOLVE must be true or false".to_string())
            })?,
            None => defaults.automatic_resolution_enabled,
        };

        let conflict_timeout_ms = parse_ranged_u64(
            &lookup,
            "EASEL_CONFLICT_TIMEOUT_MS",
            defaults.conflict_timeout_ms,
            1_000..=86_400_000,
        )?;
        let queue_tick_ms = parse_ranged_u64(
            &lookup,
            "EASEL_QUEUE_TICK_MS",
            defaults.queue_tick_ms,
            10..=60_000,
        )?;
        let expiry_tick_ms = parse_ranged_u64(
            &lookup,
            "EASEL_EXPIRY_TICK_MS",
            defaults.expiry_tick_ms,
            100..=3_600_000,
        )?;

        let manual_confidence_threshold = parse_unit_interval(
            &lookup,
            "EASEL_MANUAL_CONFIDENCE_THRESHOLD",
            defaults.manual_confidence_threshold,
        )?;
        let alternative_confidence_threshold = parse_unit_interval(
            &lookup,
            "EASEL_ALTERNATIVE_CONFIDENCE_THRESHOLD",
            defaults.alternative_confidence_threshold,
        )?;
        let history_limit = parse_ranged_u64(
            &lookup,
            "EASEL_HISTORY_LIMIT",
            u64::try_from(defaults.history_limit).unwrap_or(u64::MAX),
            100..=1_000_000,
        )?;
        let history_limit = usize::try_from(history_limit)
            .map_err(|_| ConfigError::Invalid("EASEL_HISTORY_LIMIT is too large".to_string()))?;

        Ok(Self {
            automatic_resolution_enabled,
            conflict_timeout_ms,
            queue_tick_ms,
            expiry_tick_ms,
            manual_confidence_threshold,
            alternative_confidence_threshold,
            history_limit,
            catalog: defaults.catalog,
        })
    }

    pub const fn conflict_timeout(&self) -> Duration {
        Duration::from_millis(self.conflict_timeout_ms)
    }

    pub const fn queue_tick(&self) -> Duration {
        Duration::from_millis(self.queue_tick_ms)
    }

    pub const fn expiry_tick(&self) -> Duration {
        Duration::from_millis(self.expiry_tick_ms)
    }
}

fn parse_ranged_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw.parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
}

fn parse_unit_interval(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: f64,
) -> Result<f64, ConfigError> {
    let Some(raw) = optional_trimmed(lookup, name) else {
        return Ok(default);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a number in [0, 1]")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!("{name} must be in [0, 1]")));
    }
    Ok(value)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(map: &HashMap<&str, &str>) -> Result<EngineConfig, ConfigError> {
        EngineConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = from_map(&HashMap::new()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.queue_tick(), Duration::from_secs(1));
        assert_eq!(config.expiry_tick(), Duration::from_secs(60));
    }

    #[test]
    fn overrides_are_applied() {
        let mut map = HashMap::new();
        map.insert("EASEL_AUTO_RESOLVE", "off");
        map.insert("EASEL_CONFLICT_TIMEOUT_MS", " 60000 ");
        map.insert("EASEL_MANUAL_CONFIDENCE_THRESHOLD", "0.6");
        map.insert("EASEL_HISTORY_LIMIT", "500");

        let config = from_map(&map).unwrap();
        assert_eq!(config.history_limit, 500);
        assert!(!config.automatic_resolution_enabled);
        assert_eq!(config.conflict_timeout(), Duration::from_secs(60));
        assert!((config.manual_confidence_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut map = HashMap::new();
        map.insert("EASEL_QUEUE_TICK_MS", "0");
        let error = from_map(&map).unwrap_err();
        assert!(error.to_string().contains("EASEL_QUEUE_TICK_MS"));

        let mut map = HashMap::new();
        map.insert("EASEL_ALTERNATIVE_CONFIDENCE_THRESHOLD", "1.5");
        assert!(from_map(&map).is_err());

        let mut map = HashMap::new();
        map.insert("EASEL_AUTO_RESOLVE", "maybe");
        assert!(from_map(&map).is_err());
    }

    #[test]
    fn config_deserializes_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"conflict_timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.conflict_timeout_ms, 5_000);
        assert!(config.automatic_resolution_enabled);
    }
}
