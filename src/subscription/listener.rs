// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host notification interface.

use crate::state::StateChange;

/// Receives a notification after every accepted state mutation.
///
/// The thermostat calls this once per accepted event, after the new value is
/// visible through its accessors and with its state lock released. Hosts are
/// expected to re-read whatever accessors they render; the [`StateChange`]
/// is supplied for hosts that only care about one field.
///
/// Implementations must not block. Notifications for one thermostat never
/// overlap.
pub trait StateListener: Send + Sync {
    /// Called after the thermostat state changed.
    fn state_changed(&self, change: &StateChange);
}

/// A listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StateListener for NoopListener {
    fn state_changed(&self, _change: &StateChange) {}
}
