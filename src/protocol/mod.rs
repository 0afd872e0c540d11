// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transports for thermostat messages.
//!
//! The thermostat only sees the [`Transport`] trait. Two implementations are
//! provided:
//!
//! - [`MqttBroker`]: a real broker connection using `rumqttc` (feature `mqtt`)
//! - [`LocalBus`]: an in-process bus that delivers publishes to local
//!   subscribers synchronously and records them
//!
//! Both route inbound messages through a [`TopicRouter`]. [`MqttBroker`]
//! routes one message at a time on its event loop task. [`LocalBus`] routes on
//! whichever thread publishes, so concurrent publishers reach handlers
//! concurrently. Handlers must do their own serialization, as the thermostat
//! does.

mod local_bus;
#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod topic_router;

pub use local_bus::{LocalBus, PublishedMessage};
#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use topic_router::{TopicRouter, topic_matches, validate_filter, validate_topic};

use std::sync::Arc;

use crate::error::ProtocolError;
use crate::types::Qos;

/// Handler invoked with the payload of each message received on a subscription.
pub type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// A publish/subscribe transport.
///
/// Both operations are fire-and-forget: they enqueue work and return without
/// waiting for the broker. Delivery, reconnection and acknowledgment are the
/// transport's business.
pub trait Transport: Send + Sync {
    /// Registers `handler` for every message whose topic matches `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the filter is invalid or the subscription
    /// request cannot be queued.
    fn subscribe(&self, filter: &str, qos: Qos, handler: MessageHandler)
    -> Result<(), ProtocolError>;

    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the topic is invalid or the publish cannot
    /// be queued.
    fn publish(&self, topic: &str, payload: &str, qos: Qos, retain: bool)
    -> Result<(), ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn subscribe(
        &self,
        filter: &str,
        qos: Qos,
        handler: MessageHandler,
    ) -> Result<(), ProtocolError> {
        (**self).subscribe(filter, qos, handler)
    }

    fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: Qos,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        (**self).publish(topic, payload, qos, retain)
    }
}
