// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat state tracking.

use serde::{Deserialize, Serialize};

use crate::types::{PowerState, Temperature};

use super::StateChange;

/// Merged view of a thermostat whose true state lives on the far side of the
/// transport.
///
/// The temperatures are optional because nothing is known until the device
/// or the sensor reports. Power starts as [`PowerState::Unknown`].
///
/// # Examples
///
/// ```
/// use mqtt_thermostat::state::{DeviceState, StateChange};
/// use mqtt_thermostat::types::{PowerState, Temperature};
///
/// let mut state = DeviceState::new();
/// assert_eq!(state.power(), PowerState::Unknown);
///
/// let change = StateChange::target_temperature(Temperature::new(21.0).unwrap());
/// assert!(state.apply(&change));
/// assert!(!state.apply(&change));
/// assert_eq!(state.target_temperature().map(|t| t.value()), Some(21.0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Last power state reported on the state topic.
    power: PowerState,
    /// Last set point echoed on the target temperature topic.
    target_temperature: Option<Temperature>,
    /// Last reading from the external temperature sensor.
    current_temperature: Option<Temperature>,
}

impl DeviceState {
    /// Creates a new state with nothing known.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state seeded with an initial sensor reading.
    #[must_use]
    pub fn with_current_temperature(current: Option<Temperature>) -> Self {
        Self {
            current_temperature: current,
            ..Self::default()
        }
    }

    /// Gets the power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Returns `true` if the device reported it is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.power.is_on()
    }

    /// Gets the target temperature.
    #[must_use]
    pub fn target_temperature(&self) -> Option<Temperature> {
        self.target_temperature
    }

    /// Gets the current temperature.
    #[must_use]
    pub fn current_temperature(&self) -> Option<Temperature> {
        self.current_temperature
    }

    /// Applies a state change and returns whether the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match *change {
            StateChange::Power(state) => {
                if self.power == state {
                    false
                } else {
                    self.power = state;
                    true
                }
            }
            StateChange::TargetTemperature(value) => {
                if self.target_temperature == Some(value) {
                    false
                } else {
                    self.target_temperature = Some(value);
                    true
                }
            }
            StateChange::CurrentTemperature(value) => {
                if self.current_temperature == Some(value) {
                    false
                } else {
                    self.current_temperature = Some(value);
                    true
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(value: f64) -> Temperature {
        Temperature::new(value).unwrap()
    }

    #[test]
    fn new_state_is_empty() {
        let state = DeviceState::new();
        assert_eq!(state.power(), PowerState::Unknown);
        assert!(!state.is_on());
        assert!(state.target_temperature().is_none());
        assert!(state.current_temperature().is_none());
    }

    #[test]
    fn seeded_current_temperature() {
        let state = DeviceState::with_current_temperature(Some(temp(21.5)));
        assert_eq!(state.current_temperature(), Some(temp(21.5)));
        assert!(state.target_temperature().is_none());
        assert_eq!(state.power(), PowerState::Unknown);
    }

    #[test]
    fn apply_power_change() {
        let mut state = DeviceState::new();
        assert!(state.apply(&StateChange::power(PowerState::On)));
        assert!(state.is_on());

        // Applying same state returns false
        assert!(!state.apply(&StateChange::power(PowerState::On)));

        assert!(state.apply(&StateChange::power(PowerState::Off)));
        assert_eq!(state.power(), PowerState::Off);
    }

    #[test]
    fn apply_temperatures_independently() {
        let mut state = DeviceState::new();

        assert!(state.apply(&StateChange::target_temperature(temp(22.0))));
        assert!(state.apply(&StateChange::current_temperature(temp(19.5))));
        assert!(!state.apply(&StateChange::target_temperature(temp(22.0))));

        assert_eq!(state.target_temperature(), Some(temp(22.0)));
        assert_eq!(state.current_temperature(), Some(temp(19.5)));
        assert_eq!(state.power(), PowerState::Unknown);
    }

    #[test]
    fn seeded_reading_is_kept_until_changed() {
        let mut state = DeviceState::with_current_temperature(Some(temp(17.0)));

        assert!(!state.apply(&StateChange::current_temperature(temp(17.0))));
        assert!(state.apply(&StateChange::power(PowerState::Off)));

        assert_eq!(state.power(), PowerState::Off);
        assert_eq!(state.target_temperature(), None);
        assert_eq!(state.current_temperature(), Some(temp(17.0)));
    }
}
