// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! Each inbound event that the thermostat accepts becomes exactly one
//! [`StateChange`]. The change is applied to the
//! [`DeviceState`](super::DeviceState) and then handed to the host listener.
//!
//! # Change Types
//!
//! - [`StateChange::Power`] - The state topic reported the on or off token
//! - [`StateChange::TargetTemperature`] - The target temperature topic echoed a set point
//! - [`StateChange::CurrentTemperature`] - The external sensor reported a reading
//!
//! # Examples
//!
//! ```
//! use mqtt_thermostat::state::{DeviceState, StateChange};
//! use mqtt_thermostat::types::PowerState;
//!
//! let mut state = DeviceState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::power(PowerState::On)));
//!
//! // Applying the same change again returns false
//! assert!(!state.apply(&StateChange::power(PowerState::On)));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{PowerState, Temperature};

/// Represents a change in thermostat state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StateChange {
    /// Power state changed.
    Power(PowerState),

    /// Target temperature reported by the device.
    TargetTemperature(Temperature),

    /// Current temperature reported by the external sensor.
    CurrentTemperature(Temperature),
}

impl StateChange {
    /// Creates a power state change.
    #[must_use]
    pub const fn power(state: PowerState) -> Self {
        Self::Power(state)
    }

    /// Creates a target temperature change.
    #[must_use]
    pub const fn target_temperature(value: Temperature) -> Self {
        Self::TargetTemperature(value)
    }

    /// Creates a current temperature change.
    #[must_use]
    pub const fn current_temperature(value: Temperature) -> Self {
        Self::CurrentTemperature(value)
    }

    /// Returns a short name for the kind of change, used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::TargetTemperature(_) => "target_temperature",
            Self::CurrentTemperature(_) => "current_temperature",
        }
    }
}
