// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound commands.
//!
//! Commands are fire-and-forget. They publish on the command topic with the
//! configured QoS and retain flag and never modify local state. Publish
//! failures are logged and otherwise left to the transport.

use crate::types::Temperature;

use super::Thermostat;

/// Text rendered into the fan on template while no reading is known.
const UNKNOWN_TEMPERATURE: &str = "None";

impl Thermostat {
    /// Asks the device to use a new target temperature.
    ///
    /// The payload is the value template rendered against `value`, or the
    /// plain number when no template is configured. The local target
    /// temperature is unchanged until the device echoes the new value.
    pub fn set_target_temperature(&self, value: Temperature) {
        let raw = value.to_string();
        let payload = match self.inner.settings.value_template() {
            Some(template) => template.render(&raw),
            None => raw,
        };
        self.publish_command("set_target_temperature", &payload);
    }

    /// Asks the device to turn the fan on.
    ///
    /// The payload is the value template rendered against the current
    /// temperature in float form (`20.0`). While the current temperature is
    /// unknown the template is rendered against `None`. Nothing is published
    /// without a template.
    pub fn turn_fan_on(&self) {
        let Some(template) = self.inner.settings.value_template() else {
            tracing::warn!(name = %self.name(), "No value template configured, not turning fan on");
            return;
        };
        let raw = self.current_temperature().map_or_else(
            || {
                tracing::warn!(name = %self.name(), "Current temperature unknown, rendering None");
                UNKNOWN_TEMPERATURE.to_string()
            },
            |current| current.to_float_string(),
        );

        let payload = template.render(&raw);
        self.publish_command("turn_fan_on", &payload);
    }

    /// Asks the device to turn the fan off by publishing the fan off token.
    pub fn turn_fan_off(&self) {
        let payload = self.inner.settings.fan_payload_off().to_string();
        self.publish_command("turn_fan_off", &payload);
    }

    fn publish_command(&self, command: &'static str, payload: &str) {
        let settings = &self.inner.settings;
        let Some(topic) = settings.command_topic() else {
            tracing::warn!(name = %settings.name(), command, "No command topic configured");
            return;
        };

        match self
            .inner
            .transport
            .publish(topic, payload, settings.qos(), settings.retain())
        {
            Ok(()) => tracing::debug!(
                command,
                topic = %topic,
                payload = %payload,
                qos = %settings.qos(),
                retain = settings.retain(),
                "Command published"
            ),
            Err(e) => tracing::warn!(command, topic = %topic, error = %e, "Failed to publish command"),
        }
    }
}
