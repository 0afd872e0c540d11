// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection implementing [`Transport`].
//!
//! The broker owns one `rumqttc` client and a background task that polls its
//! event loop. Incoming publishes are routed through a [`TopicRouter`] one at
//! a time on that task.
//!
//! # Examples
//!
//! ```no_run
//! use mqtt_thermostat::protocol::MqttBroker;
//!
//! # async fn example() -> mqtt_thermostat::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! // The broker can be cloned and shared between thermostats
//! let broker_clone = broker.clone();
//!
//! if broker_clone.is_connected() {
//!     println!("Connected to MQTT broker");
//! }
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::oneshot;

use crate::error::ProtocolError;
use crate::protocol::{MessageHandler, TopicRouter, Transport, validate_topic};
use crate::types::Qos;

/// Global counter for generating unique client IDs.
static BROKER_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Configuration for an MQTT broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    client_id_prefix: String,
    request_capacity: usize,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            client_id_prefix: "thermostat".to_string(),
            request_capacity: 64,
        }
    }
}

/// An MQTT broker connection that can be shared across thermostats.
///
/// `MqttBroker` is cheaply cloneable (via `Arc`).
///
/// The event loop task ends on the first connection error and does not
/// reconnect. After that [`is_connected`](Self::is_connected) returns `false`
/// and no handler receives messages again; the host builds a new broker and
/// new thermostats on it.
#[derive(Clone)]
pub struct MqttBroker {
    inner: Arc<MqttBrokerInner>,
}

struct MqttBrokerInner {
    /// The MQTT async client for publishing and subscribing.
    client: AsyncClient,
    /// Handlers for incoming messages.
    router: TopicRouter,
    /// Configuration used for this connection.
    config: MqttBrokerConfig,
    /// Connection status.
    connected: AtomicBool,
}

impl MqttBroker {
    /// Creates a new builder for configuring an MQTT broker connection.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Returns whether the broker is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns whether authentication is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.inner.config.credentials.is_some()
    }

    /// Returns the filters that currently have handlers.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.router.filters()
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be sent.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn route_message(&self, topic: &str, payload: &str) -> usize {
        self.inner.router.route(topic, payload)
    }
}

impl Transport for MqttBroker {
    fn subscribe(
        &self,
        filter: &str,
        qos: Qos,
        handler: MessageHandler,
    ) -> Result<(), ProtocolError> {
        self.inner
            .router
            .register(filter, MessageHandler::clone(&handler))?;
        if let Err(e) = self.inner.client.try_subscribe(filter, qos.into()) {
            self.inner.router.remove_handler(filter, &handler);
            return Err(ProtocolError::Mqtt(e));
        }
        tracing::debug!(filter = %filter, qos = %qos, "Subscribed to topic");
        Ok(())
    }

    fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: Qos,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        validate_topic(topic)?;
        self.inner
            .client
            .try_publish(topic, qos.into(), retain, payload.as_bytes().to_vec())
            .map_err(ProtocolError::Mqtt)?;
        tracing::debug!(
            topic = %topic,
            payload = %payload,
            qos = %qos,
            retain,
            "Published message"
        );
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT broker connection.
///
/// # Examples
///
/// ```no_run
/// use mqtt_thermostat::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> mqtt_thermostat::Result<()> {
/// let broker = MqttBroker::builder()
///     .host("192.168.1.50")
///     .port(1883)
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the client ID prefix (default: `thermostat`).
    ///
    /// The process ID and a counter are appended to keep IDs unique.
    #[must_use]
    pub fn client_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.client_id_prefix = prefix.into();
        self
    }

    /// Sets how many requests may be queued for the event loop (default: 64).
    ///
    /// Publishes and subscriptions beyond this fail instead of blocking.
    #[must_use]
    pub fn request_capacity(mut self, capacity: usize) -> Self {
        self.config.request_capacity = capacity.max(1);
        self
    }

    /// Builds and connects to the MQTT broker.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let counter = BROKER_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!(
            "{}_{}_{}",
            self.config.client_id_prefix,
            std::process::id(),
            counter
        );

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, self.config.request_capacity);

        let inner = MqttBrokerInner {
            client,
            router: TopicRouter::new(),
            config: self.config.clone(),
            connected: AtomicBool::new(false),
        };

        let broker = MqttBroker {
            inner: Arc::new(inner),
        };

        let broker_clone = broker.clone();
        let (connack_tx, connack_rx) = oneshot::channel();

        tokio::spawn(async move {
            handle_broker_events(event_loop, broker_clone, Some(connack_tx)).await;
        });

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                broker.inner.connected.store(true, Ordering::Release);
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    client_id = %client_id,
                    "Connected to MQTT broker"
                );
            }
            Ok(Err(_)) => {
                return Err(ProtocolError::ConnectionFailed(
                    "MQTT event loop terminated unexpectedly".to_string(),
                ));
            }
            Err(_) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "MQTT connection timeout after {}s",
                    timeout.as_secs()
                )));
            }
        }

        Ok(broker)
    }
}

/// Handles MQTT events for the broker connection.
async fn handle_broker_events(
    mut event_loop: EventLoop,
    broker: MqttBroker,
    connack_tx: Option<oneshot::Sender<()>>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = connack_tx;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT broker connected");
                broker.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_incoming_publish(&broker, &publish);
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                broker.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                broker.inner.connected.store(false, Ordering::Release);
                tracing::error!(
                    host = %broker.inner.config.host,
                    port = %broker.inner.config.port,
                    error = %e,
                    "MQTT event loop stopped, subscribers on this broker will receive no more messages"
                );
                break;
            }
        }
    }
}

/// Routes one incoming publish and returns how many handlers received it.
///
/// Payloads that are not UTF-8 are dropped.
fn handle_incoming_publish(broker: &MqttBroker, publish: &rumqttc::Publish) -> usize {
    match std::str::from_utf8(&publish.payload) {
        Ok(payload) => {
            tracing::debug!(
                topic = %publish.topic,
                payload = %payload,
                "MQTT message received"
            );
            broker.route_message(&publish.topic, payload)
        }
        Err(e) => {
            tracing::warn!(
                topic = %publish.topic,
                error = %e,
                "Dropping MQTT message with non UTF-8 payload"
            );
            0
        }
    }
}
