// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat state management types.
//!
//! The [`DeviceState`] struct holds the merged view of one thermostat, while
//! [`StateChange`] represents a single accepted update from one of its three
//! inbound sources.
//!
//! # Examples
//!
//! ```
//! use mqtt_thermostat::state::{DeviceState, StateChange};
//! use mqtt_thermostat::types::{PowerState, Temperature};
//!
//! let mut state = DeviceState::new();
//!
//! state.apply(&StateChange::power(PowerState::On));
//! state.apply(&StateChange::current_temperature(Temperature::new(20.5).unwrap()));
//!
//! assert!(state.is_on());
//! ```

mod device_state;
mod state_change;

pub use device_state::DeviceState;
pub use state_change::StateChange;
