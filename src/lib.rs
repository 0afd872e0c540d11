// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `mqtt_thermostat` - an event-driven thermostat over a pub/sub transport.
//!
//! The thermostat represents one climate device whose true state lives
//! remotely. It merges three unordered event streams into one snapshot:
//!
//! - **Power**: exact on/off tokens on the state topic
//! - **Target temperature**: the set point the device echoes back
//! - **Current temperature**: readings of an external sensor
//!
//! Host commands (set target temperature, fan on, fan off) become payloads
//! on a command topic. Local state is never updated optimistically.
//!
//! # Quick Start
//!
//! ## In-process bus
//!
//! ```
//! use std::sync::Arc;
//! use mqtt_thermostat::{CallbackRegistry, Temperature, Thermostat, ThermostatConfig};
//! use mqtt_thermostat::protocol::LocalBus;
//! use mqtt_thermostat::sensor::SensorRegistry;
//!
//! # fn main() -> mqtt_thermostat::Result<()> {
//! let bus = Arc::new(LocalBus::new());
//! let sensors = SensorRegistry::new();
//! sensors.set("sensor.bedroom", "19.5");
//!
//! let callbacks = Arc::new(CallbackRegistry::new());
//! callbacks.on_target_temperature_changed(|t| println!("target is now {t}"));
//!
//! let config = ThermostatConfig::new("bedroom/state", "bedroom/target", "sensor.bedroom")
//!     .with_command_topic("bedroom/set");
//! let thermostat = Thermostat::setup(&config, bus.clone(), &sensors, callbacks)?;
//!
//! thermostat.set_target_temperature(Temperature::new(21.0)?);
//! assert_eq!(bus.last_published().unwrap().payload, "21");
//!
//! // Nothing changes locally until the device reports back.
//! assert_eq!(thermostat.target_temperature(), None);
//! bus.deliver("bedroom/target", "21");
//! assert_eq!(thermostat.target_temperature(), Some(Temperature::new(21.0)?));
//! # Ok(())
//! # }
//! ```
//!
//! ## MQTT broker
//!
//! ```no_run
//! use std::sync::Arc;
//! use mqtt_thermostat::{MqttBroker, Thermostat, ThermostatConfig};
//! use mqtt_thermostat::sensor::SensorRegistry;
//! use mqtt_thermostat::subscription::NoopListener;
//!
//! #[tokio::main]
//! async fn main() -> mqtt_thermostat::Result<()> {
//!     let broker = MqttBroker::builder()
//!         .host("192.168.1.50")
//!         .port(1883)
//!         .build()
//!         .await?;
//!
//!     let sensors = SensorRegistry::new();
//!     let config = ThermostatConfig::from_json_str(r#"{
//!         "state_topic": "hvac/state",
//!         "target_temperature_topic": "hvac/target",
//!         "temperature_sensor": "sensor.hall",
//!         "command_topic": "hvac/set",
//!         "value_template": "{{ value | float }}"
//!     }"#)?;
//!
//!     let thermostat = Thermostat::setup(&config, Arc::new(broker), &sensors, Arc::new(NoopListener))?;
//!     thermostat.turn_fan_off();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod sensor;
pub mod state;
pub mod subscription;
pub mod template;
mod thermostat;
pub mod types;

pub use config::{ThermostatConfig, ThermostatSettings};
pub use error::{ConfigError, Error, ProtocolError, Result, TemplateError, ValueError};
pub use protocol::{LocalBus, TopicRouter, Transport};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use sensor::{SensorReader, SensorRegistry};
pub use state::{DeviceState, StateChange};
pub use subscription::{CallbackRegistry, NoopListener, StateListener, SubscriptionId};
pub use template::ValueTemplate;
pub use thermostat::Thermostat;
pub use types::{PowerState, Qos, Temperature};
