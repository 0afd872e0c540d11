// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound event handlers.

use crate::state::StateChange;
use crate::types::{PowerState, Temperature};

use super::ThermostatInner;

impl ThermostatInner {
    /// Handles a payload on the state topic.
    ///
    /// Only exact matches of the configured tokens change the power state.
    /// Anything else is ignored without notification.
    pub(super) fn handle_power_message(&self, payload: &str) {
        let _guard = self.dispatch.lock();

        let settings = &self.settings;
        let Some(power) =
            PowerState::from_payload(payload, settings.payload_on(), settings.payload_off())
        else {
            tracing::trace!(
                topic = %settings.state_topic(),
                payload = %payload,
                "Ignoring unrecognized power payload"
            );
            return;
        };

        self.commit(StateChange::power(power));
    }

    /// Handles a payload on the target temperature topic.
    ///
    /// Non-numeric payloads are dropped and the previous target is kept.
    pub(super) fn handle_target_temperature_message(&self, payload: &str) {
        let _guard = self.dispatch.lock();

        match payload.parse::<Temperature>() {
            Ok(value) => self.commit(StateChange::target_temperature(value)),
            Err(e) => tracing::warn!(
                topic = %self.settings.target_temperature_topic(),
                error = %e,
                "Dropping target temperature update"
            ),
        }
    }

    /// Handles a new reading of the temperature sensor.
    ///
    /// Non-numeric readings are dropped and the previous value is kept.
    pub(super) fn handle_sensor_changed(&self, value: &str) {
        let _guard = self.dispatch.lock();

        match value.parse::<Temperature>() {
            Ok(value) => self.commit(StateChange::current_temperature(value)),
            Err(e) => tracing::warn!(
                sensor = %self.settings.temperature_sensor(),
                error = %e,
                "Dropping sensor update"
            ),
        }
    }

    /// Applies `change` and notifies the listener.
    ///
    /// Must be called with the dispatch guard held. The state lock is
    /// released before the listener runs. The listener is notified for every
    /// accepted event, including ones that repeat the current value.
    fn commit(&self, change: StateChange) {
        let changed = self.state.write().apply(&change);
        tracing::debug!(
            name = %self.settings.name(),
            kind = change.kind(),
            change = ?change,
            changed,
            "Thermostat state updated"
        );
        self.listener.state_changed(&change);
    }
}
