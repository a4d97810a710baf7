//! Broker connection settings.

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;

/// Configuration for the MQTT transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Client identifier this service connects as.
    pub client_id: String,
    /// Optional broker username.
    pub username: Option<String>,
    /// Optional broker password.
    pub password: Option<String>,
    /// Topic prefix; commands go to `<prefix>/<device_key>/command`.
    pub topic_prefix: String,
    /// Payload encoding for commands.
    pub encoding: Encoding,
    /// MQTT keep-alive interval in seconds.
    pub keep_alive_seconds: u64,
    /// Capacity of the outgoing request queue.
    pub request_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "pistonhub".to_string(),
            username: None,
            password: None,
            topic_prefix: "pistonhub/devices".to_string(),
            encoding: Encoding::Plain,
            keep_alive_seconds: 30,
            request_capacity: 64,
        }
    }
}

impl TransportConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `MQTT_HOST`: Broker hostname
    /// - `MQTT_PORT`: Broker port
    /// - `MQTT_CLIENT_ID`: Client identifier
    /// - `MQTT_USER` / `MQTT_PASS`: Broker credentials
    /// - `MQTT_TOPIC_PREFIX`: Command topic prefix
    /// - `MQTT_ENCODING`: `plain` or `binary`
    /// - `MQTT_KEEP_ALIVE_SECONDS`: Keep-alive interval
    ///
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MQTT_HOST") {
            config.host = val;
        }
        if let Some(port) = std::env::var("MQTT_PORT").ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Ok(val) = std::env::var("MQTT_CLIENT_ID") {
            config.client_id = val;
        }
        if let Ok(val) = std::env::var("MQTT_USER") {
            if !val.is_empty() {
                config.username = Some(val);
            }
        }
        if let Ok(val) = std::env::var("MQTT_PASS") {
            config.password = Some(val);
        }
        if let Ok(val) = std::env::var("MQTT_TOPIC_PREFIX") {
            config.topic_prefix = val.trim_end_matches('/').to_string();
        }
        if let Ok(val) = std::env::var("MQTT_ENCODING") {
            match val.parse() {
                Ok(encoding) => config.encoding = encoding,
                Err(e) => tracing::warn!(error = %e, "ignoring MQTT_ENCODING"),
            }
        }
        if let Some(secs) = std::env::var("MQTT_KEEP_ALIVE_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.keep_alive_seconds = secs;
        }

        config
    }

    /// Command topic for a device.
    #[must_use]
    pub fn command_topic(&self, device_key: &str) -> String {
        format!("{}/{device_key}/command", self.topic_prefix)
    }
}
