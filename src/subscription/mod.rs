// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for thermostat state changes.
//!
//! The thermostat reports every accepted mutation through a
//! [`StateListener`]. Hosts either implement that trait directly or hand the
//! thermostat a [`CallbackRegistry`] and register closures on it.
//!
//! # Overview
//!
//! - [`StateListener`] - The notification seam the thermostat calls into
//! - [`CallbackRegistry`] - A listener that fans changes out to closures
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use mqtt_thermostat::subscription::CallbackRegistry;
//!
//! let callbacks = Arc::new(CallbackRegistry::new());
//!
//! let sub_id = callbacks.on_power_changed(|state| {
//!     println!("Thermostat is now {state}");
//! });
//!
//! // Later, unsubscribe
//! callbacks.unsubscribe(sub_id);
//! ```

mod callback;
mod listener;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use listener::{NoopListener, StateListener};
