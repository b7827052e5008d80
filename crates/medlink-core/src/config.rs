//! Pipeline configuration.
//!
//! Loaded from a JSON file; every field has a serde default so a partial
//! config is valid. The CLI layers flag overrides on top.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::queue::OverflowPolicy;

/// One polled field device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier, e.g. "Device-001".
    pub device_id: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
}

/// Broker connection settings shared by the publisher and subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Client id; a per-process suffix is appended by each worker.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Topic namespace prefix; telemetry goes to
    /// `<prefix>/<deviceId>/telemetry`.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_broker_port(),
            client_id: default_client_id(),
            topic_prefix: default_topic_prefix(),
            keep_alive: default_keep_alive(),
        }
    }
}

/// Clinical record store endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_sink_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_sink_timeout")]
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_url: default_sink_base_url(),
            timeout_secs: default_sink_timeout(),
        }
    }
}

/// Stage-connecting queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Publisher circuit-breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the breaker stays open, in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedlinkConfig {
    /// Register polling cadence in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Device connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Devices the edge process polls.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Concurrent sink deliveries per snapshot fan-out; 1 = sequential.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
    /// Device → patient association used by the static resolver.
    #[serde(default = "default_patients")]
    pub patients: HashMap<String, String>,
}

impl Default for MedlinkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            connect_timeout_ms: default_connect_timeout(),
            devices: Vec::new(),
            broker: BrokerConfig::default(),
            sink: SinkConfig::default(),
            queue: QueueConfig::default(),
            breaker: BreakerConfig::default(),
            fanout_concurrency: default_fanout_concurrency(),
            patients: default_patients(),
        }
    }
}

impl MedlinkConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_device(mut self, device_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        self.devices.push(DeviceConfig {
            device_id: device_id.into(),
            host: host.into(),
            port,
        });
        self
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_device_port() -> u16 {
    8502
}
fn default_broker_port() -> u16 {
    1883
}
fn default_client_id() -> String {
    "medlink".to_string()
}
fn default_topic_prefix() -> String {
    "medlink/dialysis".to_string()
}
fn default_keep_alive() -> u64 {
    60
}
fn default_sink_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_sink_timeout() -> u64 {
    30
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_cooldown_secs() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    500
}
fn default_connect_timeout() -> u64 {
    2000
}
fn default_fanout_concurrency() -> usize {
    1
}
fn default_patients() -> HashMap<String, String> {
    HashMap::from([
        ("Device-001".to_string(), "P001".to_string()),
        ("Device-002".to_string(), "P002".to_string()),
        ("Device-003".to_string(), "P003".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_all_defaults() {
        let config: MedlinkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.connect_timeout_ms, 2000);
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.broker.topic_prefix, "medlink/dialysis");
        assert_eq!(config.sink.timeout_secs, 30);
        assert_eq!(config.queue.capacity, 1024);
        assert_eq!(config.queue.overflow, OverflowPolicy::Block);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.cooldown_secs, 30);
        assert_eq!(config.fanout_concurrency, 1);
        assert_eq!(config.patients["Device-001"], "P001");
    }

    #[test]
    fn overflow_policy_parses_kebab_case() {
        let config: MedlinkConfig =
            serde_json::from_str(r#"{"queue": {"overflow": "drop-oldest"}}"#).unwrap();
        assert_eq!(config.queue.overflow, OverflowPolicy::DropOldest);
    }

    #[test]
    fn devices_parse_with_partial_fields() {
        let config: MedlinkConfig = serde_json::from_str(
            r#"{"devices": [{"device_id": "Device-001", "port": 8502}]}"#,
        )
        .unwrap();
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].host, "localhost");
    }

    #[test]
    fn load_reads_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medlink.json");
        std::fs::write(&path, r#"{"broker": {"host": "broker.local"}}"#).unwrap();

        let config = MedlinkConfig::load(&path).unwrap();
        assert_eq!(config.broker.host, "broker.local");
        assert_eq!(config.broker.port, 1883);

        assert!(MedlinkConfig::load(dir.path().join("missing.json")).is_err());
    }
}
