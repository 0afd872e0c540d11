// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for thermostat state subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateChange;
use crate::subscription::StateListener;
use crate::types::{PowerState, Temperature};

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and can be used to
/// unsubscribe later. IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Type alias for power state callbacks.
type PowerCallback = Arc<dyn Fn(PowerState) + Send + Sync>;

/// Type alias for temperature callbacks (target or current).
type TemperatureCallback = Arc<dyn Fn(Temperature) + Send + Sync>;

/// Type alias for generic state change callbacks.
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Registry for managing thermostat subscription callbacks.
///
/// Hosts register closures here and pass the registry to the thermostat as
/// its [`StateListener`]. It uses `parking_lot::RwLock` for interior
/// mutability, and callbacks are wrapped in `Arc` so dispatch can snapshot
/// them and release the lock before invoking any of them. A callback may
/// therefore subscribe or unsubscribe without deadlocking.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Power state change callbacks.
    power_callbacks: RwLock<HashMap<SubscriptionId, PowerCallback>>,
    /// Target temperature change callbacks.
    target_callbacks: RwLock<HashMap<SubscriptionId, TemperatureCallback>>,
    /// Current temperature change callbacks.
    current_callbacks: RwLock<HashMap<SubscriptionId, TemperatureCallback>>,
    /// Generic state change callbacks (receives all changes).
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            power_callbacks: RwLock::new(HashMap::new()),
            target_callbacks: RwLock::new(HashMap::new()),
            current_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for power state changes.
    pub fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.power_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for target temperature updates.
    pub fn on_target_temperature_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Temperature) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.target_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for current temperature updates.
    pub fn on_current_temperature_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Temperature) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.current_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for all state changes.
    ///
    /// This is the closest match to a plain "state changed, re-read me"
    /// notification.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.power_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.target_callbacks.write().remove(&id).is_some() {
            return true;
        }
        if self.current_callbacks.write().remove(&id).is_some() {
            return true;
        }
        self.state_changed_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.power_callbacks.write().clear();
        self.target_callbacks.write().clear();
        self.current_callbacks.write().clear();
        self.state_changed_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches a state change to relevant callbacks.
    ///
    /// Generic callbacks run first, then the ones for the specific change
    /// type. Within a group the order is arbitrary.
    pub fn dispatch(&self, change: &StateChange) {
        let generic = snapshot(&self.state_changed_callbacks);
        for callback in generic {
            callback(change);
        }

        match *change {
            StateChange::Power(state) => {
                for callback in snapshot(&self.power_callbacks) {
                    callback(state);
                }
            }
            StateChange::TargetTemperature(value) => {
                for callback in snapshot(&self.target_callbacks) {
                    callback(value);
                }
            }
            StateChange::CurrentTemperature(value) => {
                for callback in snapshot(&self.current_callbacks) {
                    callback(value);
                }
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.power_callbacks.read().len()
            + self.target_callbacks.read().len()
            + self.current_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish_non_exhaustive()
    }
}

impl StateListener for CallbackRegistry {
    fn state_changed(&self, change: &StateChange) {
        self.dispatch(change);
    }
}

fn snapshot<T: ?Sized>(map: &RwLock<HashMap<SubscriptionId, Arc<T>>>) -> Vec<Arc<T>> {
    map.read().values().cloned().collect()
}
