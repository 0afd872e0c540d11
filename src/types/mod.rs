// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for thermostat state and messaging.
//!
//! Each type ensures values are valid at construction time, so state that
//! reaches a [`DeviceState`](crate::state::DeviceState) is always well formed.
//!
//! # Types
//!
//! - [`PowerState`] - Unknown/On/Off as last reported by the device
//! - [`Temperature`] - A finite temperature reading or set point
//! - [`Qos`] - MQTT delivery guarantee (0-2)

mod power;
mod qos;
mod temperature;

pub use power::PowerState;
pub use qos::Qos;
pub use temperature::Temperature;
