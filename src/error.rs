// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the thermostat library.
//!
//! This module provides the error hierarchy used across the crate:
//! configuration validation, value parsing and transport communication.
//! Template compilation errors surface through [`ConfigError::Template`].

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The thermostat configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A value failed validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while validating a thermostat configuration.
///
/// These are setup-time failures: a thermostat is never constructed from a
/// configuration that produced one.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required address is missing.
    #[error("missing required variable: {0}")]
    MissingRequired(&'static str),

    /// The QoS level is not 0, 1 or 2.
    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// The minimum temperature bound is greater than the maximum.
    #[error("minimum temperature {min} is greater than maximum temperature {max}")]
    InvalidBounds {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },

    /// A temperature bound is not a finite number.
    #[error("invalid temperature bound: {0}")]
    InvalidBound(#[from] ValueError),

    /// The value template failed to compile.
    #[error("invalid value template: {0}")]
    Template(#[from] TemplateError),

    /// The configuration document could not be deserialized.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A temperature payload is not a finite number.
    #[error("invalid temperature: {0:?}")]
    InvalidTemperature(String),

    /// A QoS level outside 0-2 was provided.
    #[error("invalid QoS level: {0}")]
    InvalidQos(u8),
}

/// Errors related to transport communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid topic or topic filter.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),
}

/// Errors raised while compiling a payload template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// An expression block was opened but never closed.
    #[error("unclosed expression starting at offset {offset}")]
    Unclosed {
        /// Byte offset of the opening `{{`.
        offset: usize,
    },

    /// An expression block contains nothing.
    #[error("empty expression at offset {offset}")]
    EmptyExpression {
        /// Byte offset of the opening `{{`.
        offset: usize,
    },

    /// The expression refers to something other than `value` or `value_json`.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// The expression uses a filter that is not supported.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// A filter or index argument could not be parsed.
    #[error("invalid argument in expression: {0}")]
    InvalidArgument(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_display() {
        let err = ConfigError::MissingRequired("state_topic");
        assert_eq!(err.to_string(), "missing required variable: state_topic");
    }

    #[test]
    fn error_from_config_error() {
        let err: Error = ConfigError::InvalidQos(3).into();
        assert!(matches!(err, Error::Config(ConfigError::InvalidQos(3))));
    }

    #[test]
    fn value_error_display() {
        let err = ValueError::InvalidTemperature("warm".to_string());
        assert_eq!(err.to_string(), "invalid temperature: \"warm\"");
    }

    #[test]
    fn template_errors_surface_as_config_errors() {
        let err: Error = ConfigError::from(TemplateError::UnknownFilter("shout".to_string())).into();
        assert!(matches!(
            err,
            Error::Config(ConfigError::Template(TemplateError::UnknownFilter(_)))
        ));
        assert_eq!(
            err.to_string(),
            "configuration error: invalid value template: unknown filter: shout"
        );
    }

    #[test]
    fn template_error_display() {
        let err = TemplateError::Unclosed { offset: 4 };
        assert_eq!(err.to_string(), "unclosed expression starting at offset 4");
    }
}
