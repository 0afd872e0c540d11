// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat configuration.
//!
//! [`ThermostatConfig`] is the raw, serde-friendly configuration as a host
//! would load it. [`ThermostatConfig::validate`] turns it into
//! [`ThermostatSettings`], the immutable identity a thermostat is built from.
//!
//! # Examples
//!
//! ```
//! use mqtt_thermostat::config::ThermostatConfig;
//!
//! let config = ThermostatConfig::from_json_str(r#"{
//!     "name": "Living Room",
//!     "state_topic": "living/thermostat/state",
//!     "target_temperature_topic": "living/thermostat/target",
//!     "temperature_sensor": "sensor.living_room",
//!     "command_topic": "living/thermostat/set",
//!     "qos": 1
//! }"#).unwrap();
//!
//! let settings = config.validate().unwrap();
//! assert_eq!(settings.name(), "Living Room");
//! assert_eq!(settings.payload_on(), "ON");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::template::ValueTemplate;
use crate::types::{Qos, Temperature};

/// Default display name.
pub const DEFAULT_NAME: &str = "MQTT Thermostat";
/// Default on token for both power and fan payloads.
pub const DEFAULT_PAYLOAD_ON: &str = "ON";
/// Default off token for both power and fan payloads.
pub const DEFAULT_PAYLOAD_OFF: &str = "OFF";

/// Raw thermostat configuration.
///
/// Every field has a default so partial documents deserialize. The three
/// required addresses are optional here and checked by
/// [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    /// Display name.
    pub name: String,
    /// Topic the device reports its power state on. Required.
    pub state_topic: Option<String>,
    /// Topic the device reports its target temperature on. Required.
    pub target_temperature_topic: Option<String>,
    /// Address of the external temperature sensor. Required.
    pub temperature_sensor: Option<String>,
    /// Topic commands are published on.
    pub command_topic: Option<String>,
    /// Power payload meaning "on".
    pub payload_on: String,
    /// Power payload meaning "off".
    pub payload_off: String,
    /// Fan payload meaning "on".
    pub fan_payload_on: String,
    /// Fan payload meaning "off".
    pub fan_payload_off: String,
    /// Lower temperature bound.
    pub min_temp: Option<f64>,
    /// Upper temperature bound.
    pub max_temp: Option<f64>,
    /// MQTT QoS level for subscriptions and publishes (0-2).
    pub qos: u8,
    /// Retain flag for published commands.
    pub retain: bool,
    /// Unit of measurement shown by the host.
    pub unit_of_measurement: Option<String>,
    /// Template used to render outbound temperature payloads.
    pub value_template: Option<String>,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            state_topic: None,
            target_temperature_topic: None,
            temperature_sensor: None,
            command_topic: None,
            payload_on: DEFAULT_PAYLOAD_ON.to_string(),
            payload_off: DEFAULT_PAYLOAD_OFF.to_string(),
            fan_payload_on: DEFAULT_PAYLOAD_ON.to_string(),
            fan_payload_off: DEFAULT_PAYLOAD_OFF.to_string(),
            min_temp: None,
            max_temp: None,
            qos: 0,
            retain: false,
            unit_of_measurement: None,
            value_template: None,
        }
    }
}

impl ThermostatConfig {
    /// Creates a configuration with the three required addresses set.
    #[must_use]
    pub fn new(
        state_topic: impl Into<String>,
        target_temperature_topic: impl Into<String>,
        temperature_sensor: impl Into<String>,
    ) -> Self {
        Self {
            state_topic: Some(state_topic.into()),
            target_temperature_topic: Some(target_temperature_topic.into()),
            temperature_sensor: Some(temperature_sensor.into()),
            ..Self::default()
        }
    }

    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the command topic.
    #[must_use]
    pub fn with_command_topic(mut self, topic: impl Into<String>) -> Self {
        self.command_topic = Some(topic.into());
        self
    }

    /// Sets the power on/off tokens.
    #[must_use]
    pub fn with_payloads(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.payload_on = on.into();
        self.payload_off = off.into();
        self
    }

    /// Sets the fan on/off tokens.
    #[must_use]
    pub fn with_fan_payloads(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.fan_payload_on = on.into();
        self.fan_payload_off = off.into();
        self
    }

    /// Sets the temperature bounds.
    #[must_use]
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_temp = Some(min);
        self.max_temp = Some(max);
        self
    }

    /// Sets the QoS level.
    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    /// Sets the retain flag.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Sets the unit of measurement.
    #[must_use]
    pub fn with_unit_of_measurement(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    /// Sets the outbound payload template.
    #[must_use]
    pub fn with_value_template(mut self, template: impl Into<String>) -> Self {
        self.value_template = Some(template.into());
        self
    }

    /// Validates the configuration.
    ///
    /// Required addresses are checked in the order target temperature topic,
    /// state topic, temperature sensor; the first one missing is reported.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required address is missing, the QoS level
    /// is out of range, a bound is not finite, `min_temp > max_temp`, or the
    /// value template does not compile.
    pub fn validate(&self) -> Result<ThermostatSettings, ConfigError> {
        let target_temperature_topic = required(
            self.target_temperature_topic.as_ref(),
            "target_temperature_topic",
        )?;
        let state_topic = required(self.state_topic.as_ref(), "state_topic")?;
        let temperature_sensor = required(self.temperature_sensor.as_ref(), "temperature_sensor")?;

        let qos = Qos::try_from(self.qos).map_err(|_| ConfigError::InvalidQos(self.qos))?;

        let min_temp = self.min_temp.map(Temperature::new).transpose()?;
        let max_temp = self.max_temp.map(Temperature::new).transpose()?;
        if let (Some(min), Some(max)) = (min_temp, max_temp)
            && min.value() > max.value()
        {
            return Err(ConfigError::InvalidBounds {
                min: min.value(),
                max: max.value(),
            });
        }

        let value_template = self
            .value_template
            .as_deref()
            .map(ValueTemplate::parse)
            .transpose()?;

        Ok(ThermostatSettings {
            name: self.name.clone(),
            state_topic,
            target_temperature_topic,
            temperature_sensor,
            command_topic: self.command_topic.clone(),
            payload_on: self.payload_on.clone(),
            payload_off: self.payload_off.clone(),
            fan_payload_on: self.fan_payload_on.clone(),
            fan_payload_off: self.fan_payload_off.clone(),
            min_temp,
            max_temp,
            qos,
            retain: self.retain,
            unit_of_measurement: self.unit_of_measurement.clone(),
            value_template,
        })
    }
}

fn required(value: Option<&String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::MissingRequired(field)),
    }
}

/// Validated, immutable thermostat identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatSettings {
    name: String,
    state_topic: String,
    target_temperature_topic: String,
    temperature_sensor: String,
    command_topic: Option<String>,
    payload_on: String,
    payload_off: String,
    fan_payload_on: String,
    fan_payload_off: String,
    min_temp: Option<Temperature>,
    max_temp: Option<Temperature>,
    qos: Qos,
    retain: bool,
    unit_of_measurement: Option<String>,
    value_template: Option<ValueTemplate>,
}

impl ThermostatSettings {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Power state topic.
    #[must_use]
    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    /// Target temperature topic.
    #[must_use]
    pub fn target_temperature_topic(&self) -> &str {
        &self.target_temperature_topic
    }

    /// External temperature sensor address.
    #[must_use]
    pub fn temperature_sensor(&self) -> &str {
        &self.temperature_sensor
    }

    /// Command topic, if configured.
    #[must_use]
    pub fn command_topic(&self) -> Option<&str> {
        self.command_topic.as_deref()
    }

    /// Power on token.
    #[must_use]
    pub fn payload_on(&self) -> &str {
        &self.payload_on
    }

    /// Power off token.
    #[must_use]
    pub fn payload_off(&self) -> &str {
        &self.payload_off
    }

    /// Fan on token.
    ///
    /// Carried for completeness; `turn_fan_on` renders the value template
    /// instead of publishing this token.
    #[must_use]
    pub fn fan_payload_on(&self) -> &str {
        &self.fan_payload_on
    }

    /// Fan off token.
    #[must_use]
    pub fn fan_payload_off(&self) -> &str {
        &self.fan_payload_off
    }

    /// Lower temperature bound.
    #[must_use]
    pub fn min_temp(&self) -> Option<Temperature> {
        self.min_temp
    }

    /// Upper temperature bound.
    #[must_use]
    pub fn max_temp(&self) -> Option<Temperature> {
        self.max_temp
    }

    /// QoS level.
    #[must_use]
    pub fn qos(&self) -> Qos {
        self.qos
    }

    /// Retain flag for commands.
    #[must_use]
    pub fn retain(&self) -> bool {
        self.retain
    }

    /// Unit of measurement.
    #[must_use]
    pub fn unit_of_measurement(&self) -> Option<&str> {
        self.unit_of_measurement.as_deref()
    }

    /// Compiled value template.
    #[must_use]
    pub fn value_template(&self) -> Option<&ValueTemplate> {
        self.value_template.as_ref()
    }
}
