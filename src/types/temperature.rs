// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature type for readings and set points.
//!
//! Temperatures arrive as text from the transport and from the sensor
//! reader. Parsing is the only way in, and it refuses anything that is not a
//! finite number, so `NaN` and infinities never reach device state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A finite temperature value.
///
/// The unit is not tracked here; it is whatever the thermostat's
/// `unit_of_measurement` says.
///
/// # Examples
///
/// ```
/// use mqtt_thermostat::types::Temperature;
///
/// let t: Temperature = "21.5".parse().unwrap();
/// assert_eq!(t.value(), 21.5);
///
/// // Whitespace around the number is accepted
/// let t: Temperature = " 22\n".parse().unwrap();
/// assert_eq!(t.to_string(), "22");
///
/// // Non-numeric and non-finite payloads are rejected
/// assert!("warm".parse::<Temperature>().is_err());
/// assert!("nan".parse::<Temperature>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Temperature(f64);

impl Temperature {
    /// Creates a temperature from a number.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTemperature` if the value is `NaN` or
    /// infinite.
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(ValueError::InvalidTemperature(value.to_string()))
        }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Formats the value as a float, keeping `.0` on integral values.
    ///
    /// This is the text devices expect for a sensor reading (`20.0`, not
    /// `20`). Very large integral values fall back to [`Display`](fmt::Display).
    ///
    /// ```
    /// use mqtt_thermostat::types::Temperature;
    ///
    /// assert_eq!(Temperature::new(20.0).unwrap().to_float_string(), "20.0");
    /// assert_eq!(Temperature::new(20.25).unwrap().to_float_string(), "20.25");
    /// ```
    #[must_use]
    pub fn to_float_string(&self) -> String {
        if self.0.fract() == 0.0 && self.0.abs() < 1e16 {
            format!("{:.1}", self.0)
        } else {
            self.0.to_string()
        }
    }
}

impl FromStr for Temperature {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ValueError::InvalidTemperature(s.to_string()))?;
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(ValueError::InvalidTemperature(s.to_string()))
        }
    }
}

impl TryFrom<f64> for Temperature {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Temperature> for f64 {
    fn from(value: Temperature) -> Self {
        value.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal() {
        let t: Temperature = "21.5".parse().unwrap();
        assert!((t.value() - 21.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_negative_and_exponent() {
        assert_eq!("-4".parse::<Temperature>().unwrap().value(), -4.0);
        assert_eq!("2.1e1".parse::<Temperature>().unwrap().value(), 21.0);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!("  19.0 ".parse::<Temperature>().unwrap().value(), 19.0);
    }

    #[test]
    fn parse_rejects_garbage() {
        for payload in ["", "not-a-number", "22,5", "22.0C", "ON"] {
            assert_eq!(
                payload.parse::<Temperature>(),
                Err(ValueError::InvalidTemperature(payload.to_string())),
                "payload {payload:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_non_finite() {
        for payload in ["nan", "NaN", "inf", "-inf", "infinity"] {
            assert!(payload.parse::<Temperature>().is_err(), "{payload}");
        }
    }

    #[test]
    fn new_rejects_non_finite() {
        assert!(Temperature::new(f64::NAN).is_err());
        assert!(Temperature::new(f64::INFINITY).is_err());
        assert!(Temperature::new(20.0).is_ok());
    }

    #[test]
    fn display_drops_integral_fraction() {
        assert_eq!(Temperature::new(23.0).unwrap().to_string(), "23");
        assert_eq!(Temperature::new(22.5).unwrap().to_string(), "22.5");
    }

    #[test]
    fn float_string_keeps_integral_fraction() {
        let cases = [(20.0, "20.0"), (-3.0, "-3.0"), (0.0, "0.0"), (20.5, "20.5"), (-0.25, "-0.25")];
        for (value, expected) in cases {
            assert_eq!(Temperature::new(value).unwrap().to_float_string(), expected);
        }
    }

    #[test]
    fn deserialize_rejects_non_finite_via_try_from() {
        let t: Temperature = serde_json::from_str("20.5").unwrap();
        assert_eq!(t.value(), 20.5);
        assert!(serde_json::from_str::<Temperature>("\"hot\"").is_err());
    }
}
