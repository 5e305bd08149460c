// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Devices: validated configuration, runtime state and the registry.
//!
//! A device is one logical bus participant (a switch, a sensor, ...)
//! described by a [`DeviceConfig`] and identified by a [`DeviceHandle`].
//! The [`DeviceRegistry`] owns the live [`Device`] instances, routes
//! telegrams to them and publishes state updates.

#[allow(clippy::module_inception)]
mod device;
mod config;
mod handle;
mod registry;

pub use config::{DeviceConfig, DeviceKind};
pub use device::{Device, DeviceUpdate};
pub use handle::DeviceHandle;
pub use registry::DeviceRegistry;
