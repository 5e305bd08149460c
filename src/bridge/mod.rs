// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge core: lifecycle, bus traffic pump and admin operations.

#[allow(clippy::module_inception)]
mod bridge;
mod bus_link;
mod exposure;

pub use bridge::{BridgeConfig, DEFAULT_HISTORY_CAPACITY, KnxBridge};
pub use bus_link::{BusLink, BusPeer};
pub use exposure::Exposure;
