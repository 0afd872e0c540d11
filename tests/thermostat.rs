// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the thermostat over the in-process bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mqtt_thermostat::protocol::{LocalBus, PublishedMessage};
use mqtt_thermostat::sensor::SensorRegistry;
use mqtt_thermostat::{
    CallbackRegistry, ConfigError, Error, PowerState, Qos, StateChange, StateListener,
    Temperature, Thermostat, ThermostatConfig, Transport,
};

const STATE_TOPIC: &str = "living/thermostat/state";
const TARGET_TOPIC: &str = "living/thermostat/target";
const COMMAND_TOPIC: &str = "living/thermostat/set";
const SENSOR: &str = "sensor.living_room";

#[derive(Default)]
struct CountingListener {
    notifications: AtomicUsize,
}

impl CountingListener {
    fn count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl StateListener for CountingListener {
    fn state_changed(&self, _change: &StateChange) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    bus: Arc<LocalBus>,
    sensors: SensorRegistry,
    listener: Arc<CountingListener>,
    thermostat: Thermostat,
}

fn base_config() -> ThermostatConfig {
    ThermostatConfig::new(STATE_TOPIC, TARGET_TOPIC, SENSOR)
        .with_name("Living Room")
        .with_command_topic(COMMAND_TOPIC)
}

fn harness_with(config: &ThermostatConfig, sensors: SensorRegistry) -> Harness {
    let bus = Arc::new(LocalBus::new());
    let listener = Arc::new(CountingListener::default());
    let thermostat = Thermostat::setup(config, bus.clone(), &sensors, listener.clone())
        .expect("valid configuration");
    Harness {
        bus,
        sensors,
        listener,
        thermostat,
    }
}

fn harness(config: &ThermostatConfig) -> Harness {
    harness_with(config, SensorRegistry::new())
}

fn temp(value: f64) -> Temperature {
    Temperature::new(value).unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[test]
    fn a_initial_sensor_value_is_read_at_construction() {
        let sensors = SensorRegistry::new();
        sensors.set(SENSOR, "21.5");

        let h = harness_with(&base_config(), sensors);

        assert_eq!(h.thermostat.current_temperature(), Some(temp(21.5)));
        assert_eq!(h.listener.count(), 0);
    }

    #[test]
    fn b_default_on_token_turns_power_on() {
        let h = harness(&base_config());

        h.bus.deliver(STATE_TOPIC, "ON");

        assert_eq!(h.thermostat.power_state(), PowerState::On);
        assert!(h.thermostat.is_fan_on());
        assert_eq!(h.listener.count(), 1);
    }

    #[test]
    fn c_unparseable_target_keeps_previous_value() {
        let h = harness(&base_config());

        h.bus.deliver(TARGET_TOPIC, "22.0");
        assert_eq!(h.thermostat.target_temperature(), Some(temp(22.0)));

        h.bus.deliver(TARGET_TOPIC, "not-a-number");
        assert_eq!(h.thermostat.target_temperature(), Some(temp(22.0)));
        assert_eq!(h.listener.count(), 1);
    }

    #[test]
    fn d_set_target_without_template_publishes_plain_number() {
        let config = base_config().with_qos(2).with_retain(true);
        let h = harness(&config);

        h.thermostat.set_target_temperature(temp(23.0));

        assert_eq!(
            h.bus.published(),
            vec![PublishedMessage {
                topic: COMMAND_TOPIC.to_string(),
                payload: "23".to_string(),
                qos: Qos::ExactlyOnce,
                retain: true,
            }]
        );
    }

    #[test]
    fn e_fan_on_without_template_publishes_nothing() {
        let sensors = SensorRegistry::new();
        sensors.set(SENSOR, "20");
        let h = harness_with(&base_config(), sensors);

        h.thermostat.turn_fan_on();

        assert!(h.bus.published().is_empty());
    }

    #[test]
    fn f_unreadable_sensor_leaves_current_temperature_absent() {
        let h = harness(&base_config());

        assert_eq!(h.thermostat.current_temperature(), None);
        assert_eq!(h.thermostat.name(), "Living Room");
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;

    #[test]
    fn power_only_changes_on_exact_tokens_from_any_prior_state() {
        let h = harness(&base_config());
        let noise = ["on", "off", "On", "ON ", "1", "true", "", "{\"power\":\"ON\"}"];

        for prior in ["ON", "OFF"] {
            h.bus.deliver(STATE_TOPIC, prior);
            let expected = h.thermostat.power_state();
            for payload in noise {
                h.bus.deliver(STATE_TOPIC, payload);
                assert_eq!(h.thermostat.power_state(), expected, "payload {payload:?}");
            }
        }

        assert_eq!(h.listener.count(), 2);
    }

    #[test]
    fn unknown_power_is_never_reentered() {
        let h = harness(&base_config());
        assert!(h.thermostat.power_state().is_unknown());

        h.bus.deliver(STATE_TOPIC, "OFF");
        for payload in ["unknown", "", "garbage"] {
            h.bus.deliver(STATE_TOPIC, payload);
        }

        assert_eq!(h.thermostat.power_state(), PowerState::Off);
    }

    #[test]
    fn numeric_target_payloads_are_taken_verbatim() {
        let h = harness(&base_config());

        for (payload, expected) in [("18", 18.0), (" 19.25 ", 19.25), ("-3.5", -3.5), ("2e1", 20.0)] {
            h.bus.deliver(TARGET_TOPIC, payload);
            assert_eq!(h.thermostat.target_temperature(), Some(temp(expected)));
        }
    }

    #[test]
    fn set_target_never_mutates_target_temperature() {
        let h = harness(&base_config());
        h.bus.deliver(TARGET_TOPIC, "20");

        h.thermostat.set_target_temperature(temp(25.5));

        assert_eq!(h.thermostat.target_temperature(), Some(temp(20.0)));
        assert_eq!(h.bus.published_on(COMMAND_TOPIC).len(), 1);
    }

    #[test]
    fn polling_is_never_required() {
        let h = harness(&base_config());
        assert!(!h.thermostat.polling_required());
        h.bus.deliver(STATE_TOPIC, "ON");
        assert!(!h.thermostat.polling_required());
    }

    #[test]
    fn event_streams_are_independent() {
        let h = harness(&base_config());

        h.sensors.set(SENSOR, "19");
        h.bus.deliver(TARGET_TOPIC, "21");
        h.bus.deliver(STATE_TOPIC, "ON");
        h.sensors.set(SENSOR, "bogus");
        h.bus.deliver(TARGET_TOPIC, "bogus");

        let state = h.thermostat.state();
        assert_eq!(state.power(), PowerState::On);
        assert_eq!(state.target_temperature(), Some(temp(21.0)));
        assert_eq!(state.current_temperature(), Some(temp(19.0)));
        assert_eq!(h.listener.count(), 3);
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[test]
    fn fan_on_reuses_temperature_template() {
        let sensors = SensorRegistry::new();
        sensors.set(SENSOR, "20.5");
        let config = base_config()
            .with_fan_payloads("FAN_ON", "FAN_OFF")
            .with_value_template(r#"{"temperature": {{ value | float }}}"#);
        let h = harness_with(&config, sensors);

        h.thermostat.turn_fan_on();

        let sent = h.bus.last_published().unwrap();
        assert_eq!(sent.topic, COMMAND_TOPIC);
        assert_eq!(sent.payload, r#"{"temperature": 20.5}"#);
    }

    #[test]
    fn fan_off_is_unconditional() {
        let h = harness(&base_config().with_fan_payloads("FAN_ON", "FAN_OFF"));

        h.thermostat.turn_fan_off();

        assert_eq!(h.bus.last_published().unwrap().payload, "FAN_OFF");
    }

    #[test]
    fn device_echo_completes_the_round_trip() {
        let h = harness(&base_config());
        let device = Arc::downgrade(&h.bus);
        h.bus
            .subscribe(
                COMMAND_TOPIC,
                Qos::AtMostOnce,
                Arc::new(move |payload: &str| {
                    if let Some(bus) = device.upgrade() {
                        bus.deliver(TARGET_TOPIC, payload);
                    }
                }),
            )
            .unwrap();

        h.thermostat.set_target_temperature(temp(22.5));

        assert_eq!(h.thermostat.target_temperature(), Some(temp(22.5)));
        assert_eq!(h.listener.count(), 1);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    /// Asks the device for a new set point on every sensor reading.
    #[derive(Default)]
    struct FollowReading {
        thermostat: Mutex<Option<Thermostat>>,
        commands: AtomicUsize,
    }

    impl StateListener for FollowReading {
        fn state_changed(&self, change: &StateChange) {
            let StateChange::CurrentTemperature(reading) = *change else {
                return;
            };
            let thermostat = self.thermostat.lock().clone();
            if let Some(thermostat) = thermostat {
                thermostat.set_target_temperature(reading);
                self.commands.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn listener_commands_while_bus_and_sensor_events_race() {
        const ROUNDS: usize = 200;

        let bus = Arc::new(LocalBus::new());
        let sensors = Arc::new(SensorRegistry::new());
        let listener = Arc::new(FollowReading::default());
        let thermostat =
            Thermostat::setup(&base_config(), bus.clone(), &*sensors, listener.clone()).unwrap();
        *listener.thermostat.lock() = Some(thermostat.clone());

        let sensor_worker = {
            let sensors = Arc::clone(&sensors);
            thread::spawn(move || {
                for i in 0..ROUNDS {
                    sensors.set(SENSOR, format!("{}.5", 15 + i % 10));
                }
            })
        };
        let bus_worker = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for i in 0..ROUNDS {
                    bus.deliver(TARGET_TOPIC, &(18 + i % 5).to_string());
                }
            })
        };

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            let joined = sensor_worker.join().is_ok() && bus_worker.join().is_ok();
            let _ = done_tx.send(joined);
        });

        let joined = done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("event threads deadlocked");
        assert!(joined, "an event thread panicked");

        assert_eq!(listener.commands.load(Ordering::SeqCst), ROUNDS);
        assert_eq!(bus.published_on(COMMAND_TOPIC).len(), ROUNDS);
        assert!(thermostat.target_temperature().is_some());

        listener.thermostat.lock().take();
    }
}

// ============================================================================
// Setup
// ============================================================================

mod setup {
    use super::*;

    fn try_setup(config: &ThermostatConfig) -> Result<Thermostat, Error> {
        let bus = Arc::new(LocalBus::new());
        let sensors = SensorRegistry::new();
        Thermostat::setup(config, bus, &sensors, Arc::new(CallbackRegistry::new()))
    }

    #[test]
    fn each_required_address_is_enforced() {
        let mut missing_target = base_config();
        missing_target.target_temperature_topic = None;
        let mut missing_state = base_config();
        missing_state.state_topic = None;
        let mut missing_sensor = base_config();
        missing_sensor.temperature_sensor = None;

        for (config, field) in [
            (missing_target, "target_temperature_topic"),
            (missing_state, "state_topic"),
            (missing_sensor, "temperature_sensor"),
        ] {
            match try_setup(&config) {
                Err(Error::Config(ConfigError::MissingRequired(name))) => assert_eq!(name, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn command_topic_is_optional() {
        let mut config = base_config();
        config.command_topic = None;
        assert!(try_setup(&config).is_ok());
    }

    #[test]
    fn json_configuration() {
        let config = ThermostatConfig::from_json_str(
            r#"{
                "name": "Study",
                "state_topic": "study/state",
                "target_temperature_topic": "study/target",
                "temperature_sensor": "sensor.study",
                "command_topic": "study/set",
                "payload_on": "heat",
                "payload_off": "idle",
                "min_temp": 7,
                "max_temp": 35,
                "qos": 1
            }"#,
        )
        .unwrap();

        let h = harness(&config);
        h.bus.deliver("study/state", "heat");

        assert_eq!(h.thermostat.name(), "Study");
        assert_eq!(h.thermostat.power_state(), PowerState::On);
        assert_eq!(h.thermostat.min_temperature(), Some(temp(7.0)));
        assert_eq!(h.thermostat.max_temperature(), Some(temp(35.0)));
        assert_eq!(h.thermostat.settings().qos(), Qos::AtLeastOnce);
    }

    #[test]
    fn callback_registry_receives_typed_changes() {
        let bus = Arc::new(LocalBus::new());
        let sensors = SensorRegistry::new();
        let callbacks = Arc::new(CallbackRegistry::new());
        let targets = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let sink = Arc::clone(&targets);
        callbacks.on_target_temperature_changed(move |t| sink.lock().push(t.value()));

        let _thermostat =
            Thermostat::setup(&base_config(), bus.clone(), &sensors, callbacks).unwrap();
        bus.deliver(TARGET_TOPIC, "20");
        bus.deliver(STATE_TOPIC, "ON");
        bus.deliver(TARGET_TOPIC, "20.5");

        assert_eq!(*targets.lock(), vec![20.0, 20.5]);
    }
}
