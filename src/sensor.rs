// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor state reading.
//!
//! The thermostat does not measure temperature itself. It reads the last
//! known value of an external sensor once at construction and then follows
//! that sensor's change notifications. [`SensorReader`] is the seam. A host
//! that already tracks entity states implements it over its own store.
//! [`SensorRegistry`] is a ready-made in-memory implementation.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use mqtt_thermostat::sensor::{SensorReader, SensorRegistry};
//!
//! let sensors = SensorRegistry::new();
//! sensors.set("sensor.living_room", "21.5");
//!
//! sensors.on_change("sensor.living_room", Arc::new(|value: &str| {
//!     println!("new reading: {value}");
//! }));
//!
//! assert_eq!(sensors.current_value("sensor.living_room").as_deref(), Some("21.5"));
//! assert_eq!(sensors.current_value("sensor.unknown"), None);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Callback invoked with the new value each time a sensor's state changes.
pub type SensorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Read access to external sensor states.
pub trait SensorReader: Send + Sync {
    /// Returns the last known state of `sensor`, if the sensor is known.
    fn current_value(&self, sensor: &str) -> Option<String>;

    /// Registers `callback` to be invoked with every new state of `sensor`.
    fn on_change(&self, sensor: &str, callback: SensorCallback);
}

impl<T: SensorReader + ?Sized> SensorReader for Arc<T> {
    fn current_value(&self, sensor: &str) -> Option<String> {
        (**self).current_value(sensor)
    }

    fn on_change(&self, sensor: &str, callback: SensorCallback) {
        (**self).on_change(sensor, callback);
    }
}

/// In-memory sensor state store with change notification.
#[derive(Default)]
pub struct SensorRegistry {
    states: RwLock<HashMap<String, String>>,
    listeners: RwLock<HashMap<String, Vec<SensorCallback>>>,
}

impl SensorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new state for `sensor` and notifies its listeners.
    ///
    /// Listeners are called after the store lock is released, so they may
    /// read the registry.
    pub fn set(&self, sensor: impl Into<String>, value: impl Into<String>) {
        let sensor = sensor.into();
        let value = value.into();
        tracing::trace!(sensor = %sensor, value = %value, "Sensor state updated");

        self.states.write().insert(sensor.clone(), value.clone());

        let listeners: Vec<SensorCallback> = self
            .listeners
            .read()
            .get(&sensor)
            .map(|callbacks| callbacks.iter().map(Arc::clone).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(&value);
        }
    }

    /// Forgets the state of `sensor` without notifying listeners.
    ///
    /// Returns the previous state.
    pub fn remove(&self, sensor: &str) -> Option<String> {
        self.states.write().remove(sensor)
    }

    /// Returns the number of listeners registered for `sensor`.
    #[must_use]
    pub fn listener_count(&self, sensor: &str) -> usize {
        self.listeners.read().get(sensor).map_or(0, Vec::len)
    }
}

impl SensorReader for SensorRegistry {
    fn current_value(&self, sensor: &str) -> Option<String> {
        self.states.read().get(sensor).cloned()
    }

    fn on_change(&self, sensor: &str, callback: SensorCallback) {
        tracing::debug!(sensor = %sensor, "Tracking sensor state changes");
        self.listeners
            .write()
            .entry(sensor.to_string())
            .or_default()
            .push(callback);
    }
}

impl std::fmt::Debug for SensorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorRegistry")
            .field("states", &*self.states.read())
            .field("tracked_sensors", &self.listeners.read().len())
            .finish()
    }
}
