//! MQTT implementation of the [`Transport`] trait.
//!
//! Commands are published fire-and-forget: the call returns once the request
//! is queued on the client, never after a device acknowledgement.

use std::time::Duration;

use async_trait::async_trait;
use pistonhub_core::CommandToken;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::task::JoinHandle;

use crate::config::TransportConfig;
use crate::encoding::Encoding;
use crate::error::{Result, TransportError};

/// Outbound command channel to devices.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a command token to the device identified by `device_key`.
    ///
    /// Returning `Ok` means the command was handed to the broker client, not
    /// that the device received it.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be queued at all.
    async fn publish(&self, device_key: &str, token: CommandToken, encoding: Encoding)
        -> Result<()>;

    /// Encoding this transport uses when the caller has no preference.
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }
}

/// Transport publishing commands to an MQTT broker.
pub struct MqttTransport {
    client: AsyncClient,
    config: TransportConfig,
    poller: JoinHandle<()>,
}

impl MqttTransport {
    /// Create the client and spawn the task driving its event loop.
    ///
    /// The broker connection is established lazily by the event loop; this
    /// never blocks on the network.
    #[must_use]
    pub fn connect(config: TransportConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds));
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.clone().unwrap_or_default());
        }

        let (client, eventloop) = AsyncClient::new(options, config.request_capacity);
        let poller = spawn_event_loop(eventloop);

        tracing::info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            encoding = %config.encoding,
            "MQTT transport started"
        );

        Self {
            client,
            config,
            poller,
        }
    }

    /// The configuration this transport was created with.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

fn spawn_event_loop(mut eventloop: EventLoop) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!("MQTT connected");
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    tracing::warn!("MQTT broker sent disconnect");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "MQTT poll error");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    })
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(
        &self,
        device_key: &str,
        token: CommandToken,
        encoding: Encoding,
    ) -> Result<()> {
        if self.poller.is_finished() {
            return Err(TransportError::Unavailable(
                "MQTT event loop has stopped".to_string(),
            ));
        }

        let topic = self.config.command_topic(device_key);
        self.client
            .publish(&topic, QoS::AtLeastOnce, false, encoding.encode(token))
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        tracing::debug!(topic = %topic, command = %token, "command published");
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        self.config.encoding
    }
}

/// Mock transport for testing.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// One command captured by [`RecordingTransport`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PublishedCommand {
        /// Device key the command was addressed to.
        pub device_key: String,
        /// The command token.
        pub token: CommandToken,
        /// Encoding requested by the caller.
        pub encoding: Encoding,
    }

    /// A transport that records every publish in memory.
    #[derive(Default)]
    pub struct RecordingTransport {
        published: Mutex<Vec<PublishedCommand>>,
        failing: AtomicBool,
    }

    impl RecordingTransport {
        /// Create a new recording transport.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent publishes fail with `TransportError::Unavailable`.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// All commands published so far, in order.
        #[must_use]
        pub fn published(&self) -> Vec<PublishedCommand> {
            self.published.lock().clone()
        }

        /// Number of successful publishes.
        #[must_use]
        pub fn publish_count(&self) -> usize {
            self.published.lock().len()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn publish(
            &self,
            device_key: &str,
            token: CommandToken,
            encoding: Encoding,
        ) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Unavailable("mock transport offline".to_string()));
            }
            self.published.lock().push(PublishedCommand {
                device_key: device_key.to_string(),
                token,
                encoding,
            });
            Ok(())
        }
    }
}
