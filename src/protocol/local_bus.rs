// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process publish/subscribe bus.
//!
//! [`LocalBus`] implements [`Transport`] without a broker. Every publish is
//! recorded and then delivered synchronously, on the caller's thread, to the
//! handlers whose filter matches. Deliveries from different threads are not
//! serialized by the bus; each subscriber guards its own state. It is what hosts use when the thermostat
//! and the device simulator share a process, and what the tests use to drive
//! the thermostat deterministically.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use mqtt_thermostat::protocol::{LocalBus, Transport};
//! use mqtt_thermostat::types::Qos;
//!
//! let bus = LocalBus::new();
//! bus.subscribe("home/+/state", Qos::AtMostOnce, Arc::new(|payload: &str| {
//!     assert_eq!(payload, "ON");
//! })).unwrap();
//!
//! bus.publish("home/thermostat/state", "ON", Qos::AtMostOnce, false).unwrap();
//! assert_eq!(bus.published().len(), 1);
//! ```

use parking_lot::Mutex;

use crate::error::ProtocolError;
use crate::protocol::{MessageHandler, TopicRouter, Transport, validate_topic};
use crate::types::Qos;

/// A message recorded by [`LocalBus::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Message payload.
    pub payload: String,
    /// Requested QoS.
    pub qos: Qos,
    /// Requested retain flag.
    pub retain: bool,
}

/// In-process [`Transport`] that routes publishes to local subscribers.
#[derive(Debug)]
pub struct LocalBus {
    router: TopicRouter,
    published: Mutex<Vec<PublishedMessage>>,
}

impl LocalBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: TopicRouter::new(),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a message to subscribers without recording it.
    ///
    /// This simulates a message arriving from a remote device. Returns the
    /// number of handlers that received it.
    pub fn deliver(&self, topic: &str, payload: &str) -> usize {
        self.router.route(topic, payload)
    }

    /// Returns every message published so far, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    /// Returns the most recent published message.
    #[must_use]
    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.published.lock().last().cloned()
    }

    /// Returns the messages published on `topic`, oldest first.
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .iter()
            .filter(|message| message.topic == topic)
            .cloned()
            .collect()
    }

    /// Forgets every recorded publish.
    pub fn clear_published(&self) {
        self.published.lock().clear();
    }

    /// Returns the distinct filters that have subscribers.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.router.filters()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalBus {
    fn subscribe(
        &self,
        filter: &str,
        qos: Qos,
        handler: MessageHandler,
    ) -> Result<(), ProtocolError> {
        tracing::debug!(filter = %filter, qos = %qos, "Local subscription");
        self.router.register(filter, handler)
    }

    fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: Qos,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        validate_topic(topic)?;
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retain,
        });
        self.deliver(topic, payload);
        Ok(())
    }
}
