// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power state reported by a thermostat.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Power state of the thermostat as last reported on its state topic.
///
/// Starts as [`PowerState::Unknown`] and only moves to `On` or `Off` when the
/// device publishes one of the configured tokens. Once left, `Unknown` is
/// never re-entered.
///
/// # Examples
///
/// ```
/// use mqtt_thermostat::types::PowerState;
///
/// let state = PowerState::default();
/// assert_eq!(state, PowerState::Unknown);
/// assert!(!state.is_on());
/// assert_eq!(PowerState::On.as_str(), "on");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// No power message has been received yet.
    #[default]
    Unknown,
    /// The device reported it is on.
    On,
    /// The device reported it is off.
    Off,
}

impl PowerState {
    /// Returns the host-facing string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Returns `true` if the device reported it is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Returns `true` if no power state has been reported yet.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Matches a payload against the configured on/off tokens.
    ///
    /// Matching is exact: no trimming, no case folding. Returns `None` for any
    /// other payload.
    #[must_use]
    pub fn from_payload(payload: &str, on_token: &str, off_token: &str) -> Option<Self> {
        if payload == on_token {
            Some(Self::On)
        } else if payload == off_token {
            Some(Self::Off)
        } else {
            None
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
