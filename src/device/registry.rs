// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of live devices.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::address::{GroupAddress, IndividualAddress};
use crate::dpt::TranscoderRegistry;
use crate::error::{Error, Result};
use crate::telegram::Telegram;

use super::config::DeviceConfig;
use super::device::{Device, DeviceUpdate};
use super::handle::DeviceHandle;

/// Owns the live [`Device`] instances and routes telegrams to them.
///
/// Devices are indexed by handle; a secondary index maps each listened
/// group address to the handles interested in it, so inbound dispatch
/// is a single lookup.
#[derive(Debug)]
pub struct DeviceRegistry {
    own_address: IndividualAddress,
    devices: HashMap<DeviceHandle, Device>,
    by_address: HashMap<GroupAddress, Vec<DeviceHandle>>,
}

impl DeviceRegistry {
    /// Creates an empty registry sending from `own_address`.
    #[must_use]
    pub fn new(own_address: IndividualAddress) -> Self {
        Self {
            own_address,
            devices: HashMap::new(),
            by_address: HashMap::new(),
        }
    }

    /// Returns the bridge's own bus address.
    #[must_use]
    pub fn own_address(&self) -> IndividualAddress {
        self.own_address
    }

    /// Instantiates a device from its validated config and binds its
    /// addresses. A previous device under the same handle is replaced.
    ///
    /// # Errors
    ///
    /// Fails when the config names an unregistered value type.
    pub fn bind(
        &mut self,
        handle: DeviceHandle,
        config: DeviceConfig,
        transcoders: &TranscoderRegistry,
    ) -> Result<()> {
        let transcoder = transcoders.parse(config.kind.transcoder_name())?;
        self.unbind(&handle);
        for address in config.listened_addresses() {
            self.by_address.entry(address).or_default().push(handle.clone());
        }
        info!(device = %handle, name = %config.name, "bound device");
        self.devices.insert(handle.clone(), Device::new(handle, config, transcoder));
        Ok(())
    }

    /// Removes a device and its address bindings. Unknown handles are a
    /// no-op.
    pub fn unbind(&mut self, handle: &DeviceHandle) {
        if self.devices.remove(handle).is_none() {
            return;
        }
        self.by_address.retain(|_, handles| {
            handles.retain(|bound| bound != handle);
            !handles.is_empty()
        });
        debug!(device = %handle, "unbound device");
    }

    /// Removes every device.
    pub fn unbind_all(&mut self) {
        self.devices.clear();
        self.by_address.clear();
    }

    /// Returns the device for `handle`.
    #[must_use]
    pub fn get(&self, handle: &DeviceHandle) -> Option<&Device> {
        self.devices.get(handle)
    }

    /// Returns the number of bound devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` when no devices are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Returns a state notification for every bound device.
    #[must_use]
    pub fn updates(&self) -> Vec<DeviceUpdate> {
        self.devices.values().map(Device::update).collect()
    }

    /// Dispatches a telegram to every device listening on its
    /// destination.
    ///
    /// Returns the state updates of changed devices and any response
    /// telegrams the devices produced.
    pub fn handle_telegram(&mut self, telegram: &Telegram) -> (Vec<DeviceUpdate>, Vec<Telegram>) {
        let Some(handles) = self.by_address.get(&telegram.destination).cloned() else {
            return (Vec::new(), Vec::new());
        };
        let mut updates = Vec::new();
        let mut responses = Vec::new();
        for handle in handles {
            if let Some(device) = self.devices.get_mut(&handle) {
                let (changed, mut answers) = device.on_telegram(telegram, self.own_address);
                if changed {
                    updates.push(device.update());
                }
                responses.append(&mut answers);
            }
        }
        (updates, responses)
    }

    /// Applies a user command to a device.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, read-only platforms and unencodable
    /// values.
    pub fn apply_command(
        &mut self,
        handle: &DeviceHandle,
        value: &Value,
    ) -> Result<(DeviceUpdate, Vec<Telegram>)> {
        let device = self
            .devices
            .get_mut(handle)
            .ok_or_else(|| Error::DeviceNotFound(handle.to_string()))?;
        let telegrams = device.apply_command(value, self.own_address)?;
        Ok((device.update(), telegrams))
    }

    /// Seeds persisted states into devices that cannot read theirs from
    /// the bus. Returns the updates of devices that took a seed.
    pub fn seed_states(&mut self, states: &HashMap<DeviceHandle, Value>) -> Vec<DeviceUpdate> {
        let mut updates = Vec::new();
        for (handle, value) in states {
            if let Some(device) = self.devices.get_mut(handle) {
                if device.seed_state(value.clone()) {
                    updates.push(device.update());
                }
            }
        }
        updates
    }

    /// Returns the startup read requests of every device configured to
    /// sync its state.
    #[must_use]
    pub fn sync_requests(&self) -> Vec<Telegram> {
        self.devices
            .values()
            .filter_map(|device| device.sync_request(self.own_address))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::telegram::{Direction, TelegramPayload, TelegramValue};

    use super::*;

    fn registry() -> (DeviceRegistry, TranscoderRegistry) {
        (
            DeviceRegistry::new("1.0.250".parse().unwrap()),
            TranscoderRegistry::with_defaults(),
        )
    }

    fn switch_config(write: &str, state: Option<&str>) -> DeviceConfig {
        let mut data = json!({"name": "Test", "ga_write": write});
        if let Some(state) = state {
            data["ga_state"] = json!(state);
        }
        DeviceConfig::from_value("switch", &data).unwrap()
    }

    fn incoming_write(destination: &str, value: TelegramValue) -> Telegram {
        Telegram::new(
            "1.1.4".parse().unwrap(),
            destination.parse().unwrap(),
            TelegramPayload::GroupValueWrite(value),
            Direction::Incoming,
        )
    }

    #[test]
    fn bind_rejects_unknown_value_type() {
        let (mut devices, transcoders) = registry();
        let config = DeviceConfig::from_value(
            "sensor",
            &json!({"name": "X", "value_type": "hyperspace", "ga_state": "1/0/0"}),
        )
        .unwrap();
        assert!(devices
            .bind(DeviceHandle::generate("sensor"), config, &transcoders)
            .is_err());
        assert!(devices.is_empty());
    }

    #[test]
    fn telegram_reaches_listening_device() {
        let (mut devices, transcoders) = registry();
        let handle = DeviceHandle::generate("switch");
        devices
            .bind(handle.clone(), switch_config("1/2/3", Some("1/2/4")), &transcoders)
            .unwrap();

        let (updates, responses) =
            devices.handle_telegram(&incoming_write("1/2/4", TelegramValue::Bit(1)));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].handle, handle);
        assert_eq!(updates[0].state, Some(json!(true)));
        assert!(responses.is_empty());

        let (updates, _) = devices.handle_telegram(&incoming_write("5/5/5", TelegramValue::Bit(1)));
        assert!(updates.is_empty());
    }

    #[test]
    fn rebind_replaces_addresses() {
        let (mut devices, transcoders) = registry();
        let handle = DeviceHandle::generate("switch");
        devices
            .bind(handle.clone(), switch_config("1/2/3", None), &transcoders)
            .unwrap();
        devices
            .bind(handle.clone(), switch_config("5/5/5", None), &transcoders)
            .unwrap();

        let (updates, _) = devices.handle_telegram(&incoming_write("1/2/3", TelegramValue::Bit(1)));
        assert!(updates.is_empty());
        let (updates, _) = devices.handle_telegram(&incoming_write("5/5/5", TelegramValue::Bit(1)));
        assert_eq!(updates.len(), 1);
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn unbind_stops_dispatch() {
        let (mut devices, transcoders) = registry();
        let handle = DeviceHandle::generate("switch");
        devices
            .bind(handle.clone(), switch_config("1/2/3", None), &transcoders)
            .unwrap();
        devices.unbind(&handle);

        let (updates, _) = devices.handle_telegram(&incoming_write("1/2/3", TelegramValue::Bit(1)));
        assert!(updates.is_empty());
        assert!(devices.is_empty());
    }

    #[test]
    fn command_for_unknown_handle_fails() {
        let (mut devices, _) = registry();
        let handle = DeviceHandle::generate("switch");
        assert!(matches!(
            devices.apply_command(&handle, &json!(true)),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn command_produces_write_and_update() {
        let (mut devices, transcoders) = registry();
        let handle = DeviceHandle::generate("switch");
        devices
            .bind(handle.clone(), switch_config("1/2/3", None), &transcoders)
            .unwrap();

        let (update, telegrams) = devices.apply_command(&handle, &json!(true)).unwrap();
        assert_eq!(update.state, Some(json!(true)));
        assert_eq!(telegrams.len(), 1);
        assert_eq!(telegrams[0].source, devices.own_address());
    }

    #[test]
    fn seed_states_skips_readable_devices() {
        let (mut devices, transcoders) = registry();
        let readable = DeviceHandle::generate("switch");
        let unreadable = DeviceHandle::generate("switch");
        devices
            .bind(readable.clone(), switch_config("1/2/3", Some("1/2/4")), &transcoders)
            .unwrap();
        devices
            .bind(unreadable.clone(), switch_config("2/2/3", None), &transcoders)
            .unwrap();

        let mut states = HashMap::new();
        states.insert(readable, json!(true));
        states.insert(unreadable.clone(), json!(true));

        let updates = devices.seed_states(&states);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].handle, unreadable);
    }

    #[test]
    fn sync_requests_cover_syncing_devices() {
        let (mut devices, transcoders) = registry();
        let data = json!({
            "name": "Synced",
            "ga_write": "1/2/3",
            "ga_state": "1/2/4",
            "sync_state": true,
        });
        devices
            .bind(
                DeviceHandle::generate("switch"),
                DeviceConfig::from_value("switch", &data).unwrap(),
                &transcoders,
            )
            .unwrap();
        devices
            .bind(
                DeviceHandle::generate("switch"),
                switch_config("2/2/3", Some("2/2/4")),
                &transcoders,
            )
            .unwrap();

        let requests = devices.sync_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].destination.to_string(), "1/2/4");
    }
}
