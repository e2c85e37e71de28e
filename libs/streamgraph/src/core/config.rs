// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Construction-time configuration for a stream graph.
//!
//! Configuration arrives either as a loose key/value map (the form embedding
//! applications usually pass around) or as a `.toml` / `.yaml` file. Both end
//! up as a typed [`StreamConfig`].

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::core::queue::QueueCapacity;
use crate::core::{Result, StreamError};

/// Max wait in milliseconds for provider reads and queue takes.
pub const TIMEOUT_KEY: &str = "TIMEOUT";
/// Default inbound queue capacity (positive integer, `-1` or `"unbounded"`).
pub const QUEUE_CAPACITY_KEY: &str = "QUEUE_CAPACITY";
/// Parallelism used when a node omits an explicit hint.
pub const DEFAULT_PARALLELISM_KEY: &str = "DEFAULT_PARALLELISM";
/// Graceful drain budget for `stop()`, in milliseconds.
pub const SHUTDOWN_TIMEOUT_KEY: &str = "SHUTDOWN_TIMEOUT";
/// Metrics publication period in milliseconds.
pub const METRICS_INTERVAL_KEY: &str = "METRICS_INTERVAL";

const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_METRICS_INTERVAL_MS: u64 = 1_000;

/// Typed stream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Bound on provider reads and queue takes. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Capacity of every node's inbound queue.
    pub queue_capacity: QueueCapacity,
    /// Worker count for nodes registered with [`ParallelismHint::Default`](crate::core::ParallelismHint).
    pub default_parallelism: NonZeroUsize,
    /// How long `stop()` lets buffered datums drain before forcing.
    pub shutdown_timeout: Duration,
    /// Period between metrics-sink publications.
    pub metrics_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            queue_capacity: QueueCapacity::Unbounded,
            default_parallelism: NonZeroUsize::MIN,
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            metrics_interval: Duration::from_millis(DEFAULT_METRICS_INTERVAL_MS),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider-read / queue-take bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: QueueCapacity) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_default_parallelism(mut self, parallelism: NonZeroUsize) -> Self {
        self.default_parallelism = parallelism;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }

    /// Build a config from a key/value map using the `*_KEY` constants.
    ///
    /// Unrecognised keys are ignored. Values may be JSON numbers or numeric
    /// strings.
    pub fn from_map(map: &HashMap<String, Value>) -> Result<Self> {
        let mut config = Self::default();

        for (key, value) in map {
            match key.as_str() {
                TIMEOUT_KEY => {
                    config.timeout = parse_timeout(key, parse_integer(key, value)?)?;
                }
                QUEUE_CAPACITY_KEY => {
                    config.queue_capacity = parse_capacity(key, value)?;
                }
                DEFAULT_PARALLELISM_KEY => {
                    config.default_parallelism = parse_parallelism(key, value)?;
                }
                SHUTDOWN_TIMEOUT_KEY => {
                    config.shutdown_timeout = parse_millis(key, value)?;
                }
                METRICS_INTERVAL_KEY => {
                    config.metrics_interval = parse_millis(key, value)?;
                }
                other => {
                    tracing::debug!("Ignoring unrecognised stream config key '{}'", other);
                }
            }
        }

        Ok(config)
    }

    /// Load a config file. The format follows the extension: `.toml`,
    /// `.yaml` or `.yml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let file: StreamConfigFile = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                StreamError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
                StreamError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            _ => {
                return Err(StreamError::Configuration(format!(
                    "Unsupported config format for {} (expected .toml, .yaml or .yml)",
                    path.display()
                )))
            }
        };

        let config = file.into_config()?;
        tracing::info!("Loaded stream config from {}", path.display());
        Ok(config)
    }
}

/// On-disk representation; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StreamConfigFile {
    #[serde(default)]
    timeout_ms: Option<i64>,
    #[serde(default)]
    queue_capacity: Option<CapacityRepr>,
    #[serde(default)]
    default_parallelism: Option<usize>,
    #[serde(default)]
    shutdown_timeout_ms: Option<u64>,
    #[serde(default)]
    metrics_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Count(i64),
    Word(String),
}

impl StreamConfigFile {
    fn into_config(self) -> Result<StreamConfig> {
        let mut config = StreamConfig::default();

        if let Some(ms) = self.timeout_ms {
            config.timeout = parse_timeout("timeout_ms", ms)?;
        }
        if let Some(repr) = self.queue_capacity {
            config.queue_capacity = match repr {
                CapacityRepr::Count(n) => QueueCapacity::from_signed(n)?,
                CapacityRepr::Word(word) => word.parse()?,
            };
        }
        if let Some(n) = self.default_parallelism {
            config.default_parallelism = NonZeroUsize::new(n).ok_or_else(|| {
                StreamError::Configuration("default_parallelism must be >= 1".into())
            })?;
        }
        if let Some(ms) = self.shutdown_timeout_ms {
            config.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.metrics_interval_ms {
            config.metrics_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_integer(key: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        StreamError::Configuration(format!("'{}' must be an integer, got {}", key, value))
    })
}

/// Negative means unbounded. Zero is rejected.
fn parse_timeout(key: &str, ms: i64) -> Result<Option<Duration>> {
    match ms {
        0 => Err(StreamError::Configuration(format!(
            "'{}' must be positive (or negative for unbounded), got 0",
            key
        ))),
        ms if ms < 0 => Ok(None),
        ms => Ok(Some(Duration::from_millis(ms as u64))),
    }
}

fn parse_millis(key: &str, value: &Value) -> Result<Duration> {
    let ms = parse_integer(key, value)?;
    if ms < 0 {
        return Err(StreamError::Configuration(format!(
            "'{}' must not be negative, got {}",
            key, ms
        )));
    }
    Ok(Duration::from_millis(ms as u64))
}

fn parse_parallelism(key: &str, value: &Value) -> Result<NonZeroUsize> {
    let n = parse_integer(key, value)?;
    usize::try_from(n)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| StreamError::Configuration(format!("'{}' must be >= 1, got {}", key, n)))
}

fn parse_capacity(key: &str, value: &Value) -> Result<QueueCapacity> {
    match value {
        Value::String(s) if s.trim().parse::<i64>().is_err() => s.parse(),
        _ => QueueCapacity::from_signed(parse_integer(key, value)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.timeout, None);
        assert_eq!(config.queue_capacity, QueueCapacity::Unbounded);
        assert_eq!(config.default_parallelism.get(), 1);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_map_recognised_keys() {
        let config = StreamConfig::from_map(&map(&[
            (TIMEOUT_KEY, json!(2000)),
            (QUEUE_CAPACITY_KEY, json!(10)),
            (DEFAULT_PARALLELISM_KEY, json!("3")),
            (SHUTDOWN_TIMEOUT_KEY, json!(500)),
            ("SOMETHING_ELSE", json!(true)),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Some(Duration::from_millis(2000)));
        assert_eq!(config.queue_capacity, QueueCapacity::bounded(10).unwrap());
        assert_eq!(config.default_parallelism.get(), 3);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_from_map_unbounded_sentinels() {
        let config = StreamConfig::from_map(&map(&[
            (TIMEOUT_KEY, json!(-1)),
            (QUEUE_CAPACITY_KEY, json!(-1)),
        ]))
        .unwrap();
        assert_eq!(config.timeout, None);
        assert_eq!(config.queue_capacity, QueueCapacity::Unbounded);

        let config =
            StreamConfig::from_map(&map(&[(QUEUE_CAPACITY_KEY, json!("unbounded"))])).unwrap();
        assert_eq!(config.queue_capacity, QueueCapacity::Unbounded);
    }

    #[test]
    fn test_from_map_rejects_bad_values() {
        assert!(StreamConfig::from_map(&map(&[(TIMEOUT_KEY, json!("soon"))])).is_err());
        assert!(StreamConfig::from_map(&map(&[(TIMEOUT_KEY, json!(0))])).is_err());
        assert!(StreamConfig::from_map(&map(&[(QUEUE_CAPACITY_KEY, json!(0))])).is_err());
        assert!(StreamConfig::from_map(&map(&[(DEFAULT_PARALLELISM_KEY, json!(0))])).is_err());
        assert!(StreamConfig::from_map(&map(&[(SHUTDOWN_TIMEOUT_KEY, json!(-5))])).is_err());
    }

    #[test]
    fn test_load_toml_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("stream.toml");
        std::fs::write(
            &toml_path,
            "timeout_ms = 250\nqueue_capacity = 64\ndefault_parallelism = 2\n",
        )
        .unwrap();
        let config = StreamConfig::load(&toml_path).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.queue_capacity, QueueCapacity::bounded(64).unwrap());
        assert_eq!(config.default_parallelism.get(), 2);

        let yaml_path = dir.path().join("stream.yaml");
        std::fs::write(
            &yaml_path,
            "queue_capacity: unbounded\nshutdown_timeout_ms: 1500\n",
        )
        .unwrap();
        let config = StreamConfig::load(&yaml_path).unwrap();
        assert_eq!(config.queue_capacity, QueueCapacity::Unbounded);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_load_rejects_unknown_format_and_fields() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("stream.json");
        std::fs::write(&json_path, "{}").unwrap();
        assert!(StreamConfig::load(&json_path).is_err());

        let toml_path = dir.path().join("typo.toml");
        std::fs::write(&toml_path, "timeout = 5\n").unwrap();
        assert!(StreamConfig::load(&toml_path).is_err());
    }
}
