//! Worker configuration.
//!
//! Read from the process environment (the CLI loads `.env` first):
//! - `CASCADE_WORKERS`: number of worker tasks
//! - `CASCADE_POP_TIMEOUT_MS`: how long one pop waits for a job

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const WORKERS_VAR: &str = "CASCADE_WORKERS";
pub const POP_TIMEOUT_VAR: &str = "CASCADE_POP_TIMEOUT_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("CASCADE_WORKERS must be at least 1")]
    NoWorkers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub workers: usize,
    pub pop_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            pop_timeout: Duration::from_millis(200),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(WORKERS_VAR) {
            config.workers = parse(WORKERS_VAR, value)?;
        }
        if let Some(value) = lookup(POP_TIMEOUT_VAR) {
            config.pop_timeout = Duration::from_millis(parse(POP_TIMEOUT_VAR, value)?);
        }
        if config.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WorkerConfig::default());
    }

    #[test]
    fn values_are_read() {
        let config = WorkerConfig::from_lookup(lookup(&[
            (WORKERS_VAR, "8"),
            (POP_TIMEOUT_VAR, " 50 "),
        ]))
        .unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.pop_timeout, Duration::from_millis(50));
    }

    #[rstest]
    #[case::not_a_number(WORKERS_VAR, "many")]
    #[case::negative(WORKERS_VAR, "-1")]
    #[case::bad_timeout(POP_TIMEOUT_VAR, "1.5s")]
    fn invalid_values_are_rejected(#[case] key: &'static str, #[case] value: &str) {
        let err = WorkerConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key,
                value: value.to_string()
            }
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = WorkerConfig::from_lookup(lookup(&[(WORKERS_VAR, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::NoWorkers);
    }
}
