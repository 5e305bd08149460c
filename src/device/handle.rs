// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a stored device entity.
///
/// Handles render as `platform.uuid`, e.g. `switch.5c65...`, matching
/// the entity ids used by the config store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceHandle(String);

impl DeviceHandle {
    /// Creates a fresh handle for a device of the given platform.
    #[must_use]
    pub fn generate(platform: &str) -> Self {
        Self(format!("{platform}.{}", Uuid::new_v4()))
    }

    /// Wraps an existing entity id.
    #[must_use]
    pub fn from_entity_id(entity_id: impl Into<String>) -> Self {
        Self(entity_id.into())
    }

    /// Returns the entity id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the platform prefix of the handle, if well formed.
    #[must_use]
    pub fn platform(&self) -> Option<&str> {
        self.0.split_once('.').map(|(platform, _)| platform)
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceHandle {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_prefixes_platform() {
        let handle = DeviceHandle::generate("switch");
        assert!(handle.as_str().starts_with("switch."));
        assert_eq!(handle.platform(), Some("switch"));
    }

    #[test]
    fn generated_handles_are_unique() {
        assert_ne!(DeviceHandle::generate("sensor"), DeviceHandle::generate("sensor"));
    }

    #[test]
    fn handles_order_by_entity_id() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(DeviceHandle::from_entity_id("switch.b"), 2);
        map.insert(DeviceHandle::from_entity_id("sensor.a"), 1);
        map.insert(DeviceHandle::from_entity_id("switch.a"), 3);

        let ids: Vec<&str> = map.keys().map(DeviceHandle::as_str).collect();
        assert_eq!(ids, vec!["sensor.a", "switch.a", "switch.b"]);
    }

    #[test]
    fn serde_is_transparent() {
        let handle = DeviceHandle::from_entity_id("light.abc");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"light.abc\"");
    }
}
