// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The thermostat: one climate device whose true state lives remotely.
//!
//! A [`Thermostat`] merges three independent, unordered event streams into a
//! single [`DeviceState`]:
//!
//! - power payloads on the state topic,
//! - target temperatures reported by the device on the target topic,
//! - readings of an external temperature sensor.
//!
//! Host commands are translated into payloads on the command topic. Commands
//! never touch local state; a new target temperature only becomes visible
//! once the device echoes it back.
//!
//! # Concurrency
//!
//! Event handlers may be invoked from any thread. Each handler runs its
//! read-modify-notify section under a per-thermostat dispatch guard, so
//! notifications for one thermostat never overlap. The state lock is released
//! before the listener runs, which lets listeners call accessors and
//! commands.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use mqtt_thermostat::{Thermostat, ThermostatConfig};
//! use mqtt_thermostat::protocol::LocalBus;
//! use mqtt_thermostat::sensor::SensorRegistry;
//! use mqtt_thermostat::subscription::NoopListener;
//! use mqtt_thermostat::types::PowerState;
//!
//! let bus = Arc::new(LocalBus::new());
//! let sensors = SensorRegistry::new();
//! sensors.set("sensor.office", "20.5");
//!
//! let config = ThermostatConfig::new("office/state", "office/target", "sensor.office")
//!     .with_command_topic("office/set");
//! let thermostat = Thermostat::setup(&config, bus.clone(), &sensors, Arc::new(NoopListener))?;
//!
//! assert_eq!(thermostat.current_temperature().map(|t| t.value()), Some(20.5));
//!
//! bus.deliver("office/state", "ON");
//! assert_eq!(thermostat.power_state(), PowerState::On);
//! # Ok::<(), mqtt_thermostat::Error>(())
//! ```

mod commands;
mod handlers;

use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, RwLock};

use crate::config::{ThermostatConfig, ThermostatSettings};
use crate::error::Error;
use crate::protocol::{MessageHandler, Transport};
use crate::sensor::{SensorCallback, SensorReader};
use crate::state::DeviceState;
use crate::subscription::StateListener;
use crate::types::{PowerState, Temperature};

/// Reconciles remote device events into a local state snapshot.
///
/// `Thermostat` is a cheap handle; clones share the same state.
#[derive(Clone)]
pub struct Thermostat {
    inner: Arc<ThermostatInner>,
}

struct ThermostatInner {
    settings: ThermostatSettings,
    state: RwLock<DeviceState>,
    transport: Arc<dyn Transport>,
    listener: Arc<dyn StateListener>,
    /// Held for the whole read-modify-notify section of every handler.
    dispatch: ReentrantMutex<()>,
}

impl Thermostat {
    /// Validates `config` and builds a thermostat from it.
    ///
    /// Validation failures are logged at error level and returned; no
    /// thermostat exists afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid, or
    /// `Error::Protocol` if a subscription could not be registered.
    pub fn setup(
        config: &ThermostatConfig,
        transport: Arc<dyn Transport>,
        sensors: &dyn SensorReader,
        listener: Arc<dyn StateListener>,
    ) -> Result<Self, Error> {
        let settings = config.validate().map_err(|e| {
            tracing::error!(name = %config.name, error = %e, "Invalid thermostat configuration");
            Error::Config(e)
        })?;

        Self::new(settings, transport, sensors, listener).inspect_err(|e| {
            tracing::error!(name = %config.name, error = %e, "Thermostat setup failed");
        })
    }

    /// Builds a thermostat from already validated settings.
    ///
    /// Reads the sensor's last known value once, then subscribes to the
    /// state topic, the target temperature topic and the sensor's change
    /// notifications. An unknown or non-numeric sensor value leaves the
    /// current temperature absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the transport rejects a subscription.
    pub fn new(
        settings: ThermostatSettings,
        transport: Arc<dyn Transport>,
        sensors: &dyn SensorReader,
        listener: Arc<dyn StateListener>,
    ) -> Result<Self, Error> {
        let current = read_sensor(sensors, settings.temperature_sensor());

        let inner = Arc::new(ThermostatInner {
            settings,
            state: RwLock::new(DeviceState::with_current_temperature(current)),
            transport,
            listener,
            dispatch: ReentrantMutex::new(()),
        });

        let settings = &inner.settings;
        let qos = settings.qos();

        inner.transport.subscribe(
            settings.state_topic(),
            qos,
            message_handler(&inner, ThermostatInner::handle_power_message),
        )?;
        inner.transport.subscribe(
            settings.target_temperature_topic(),
            qos,
            message_handler(&inner, ThermostatInner::handle_target_temperature_message),
        )?;
        sensors.on_change(
            settings.temperature_sensor(),
            sensor_handler(&inner, ThermostatInner::handle_sensor_changed),
        );

        tracing::debug!(
            name = %settings.name(),
            state_topic = %settings.state_topic(),
            target_topic = %settings.target_temperature_topic(),
            sensor = %settings.temperature_sensor(),
            current = ?current.map(|t| t.value()),
            "Thermostat ready"
        );

        Ok(Self { inner })
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.settings.name()
    }

    /// Unit of measurement, if configured.
    #[must_use]
    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.inner.settings.unit_of_measurement()
    }

    /// Lower temperature bound, if configured.
    #[must_use]
    pub fn min_temperature(&self) -> Option<Temperature> {
        self.inner.settings.min_temp()
    }

    /// Upper temperature bound, if configured.
    #[must_use]
    pub fn max_temperature(&self) -> Option<Temperature> {
        self.inner.settings.max_temp()
    }

    /// Last reported power state.
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        self.inner.state.read().power()
    }

    /// Last accepted sensor reading.
    #[must_use]
    pub fn current_temperature(&self) -> Option<Temperature> {
        self.inner.state.read().current_temperature()
    }

    /// Last target temperature reported by the device.
    #[must_use]
    pub fn target_temperature(&self) -> Option<Temperature> {
        self.inner.state.read().target_temperature()
    }

    /// Returns `true` if the device reported itself on.
    #[must_use]
    pub fn is_fan_on(&self) -> bool {
        self.power_state().is_on()
    }

    /// Always `false`: the thermostat is purely event driven.
    #[must_use]
    pub const fn polling_required(&self) -> bool {
        false
    }

    /// Returns a snapshot of the whole state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        *self.inner.state.read()
    }

    /// Returns the validated settings the thermostat was built from.
    #[must_use]
    pub fn settings(&self) -> &ThermostatSettings {
        &self.inner.settings
    }
}

impl std::fmt::Debug for Thermostat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thermostat")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn read_sensor(sensors: &dyn SensorReader, sensor: &str) -> Option<Temperature> {
    let raw = sensors.current_value(sensor)?;
    match raw.parse::<Temperature>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(sensor = %sensor, error = %e, "Initial sensor value not numeric");
            None
        }
    }
}

fn message_handler(
    inner: &Arc<ThermostatInner>,
    handle: fn(&ThermostatInner, &str),
) -> MessageHandler {
    let weak: Weak<ThermostatInner> = Arc::downgrade(inner);
    Arc::new(move |payload: &str| {
        if let Some(inner) = weak.upgrade() {
            handle(&inner, payload);
        }
    })
}

fn sensor_handler(
    inner: &Arc<ThermostatInner>,
    handle: fn(&ThermostatInner, &str),
) -> SensorCallback {
    let weak: Weak<ThermostatInner> = Arc::downgrade(inner);
    Arc::new(move |value: &str| {
        if let Some(inner) = weak.upgrade() {
            handle(&inner, value);
        }
    })
}
