// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live device instances.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::address::IndividualAddress;
use crate::dpt::TranscoderRef;
use crate::error::{ConfigError, Error, Result};
use crate::telegram::{Telegram, TelegramPayload};

use super::config::{DeviceConfig, DeviceKind};
use super::handle::DeviceHandle;

/// State change notification published when a device updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceUpdate {
    /// The device's entity id.
    pub handle: DeviceHandle,
    /// Display name.
    pub name: String,
    /// Platform name, e.g. `switch`.
    pub platform: String,
    /// New state, `None` while unknown.
    pub state: Option<Value>,
}

/// A configured device with its runtime state.
#[derive(Debug)]
pub struct Device {
    handle: DeviceHandle,
    config: DeviceConfig,
    transcoder: TranscoderRef,
    state: Option<Value>,
}

impl Device {
    /// Creates a device with unknown state.
    #[must_use]
    pub fn new(handle: DeviceHandle, config: DeviceConfig, transcoder: TranscoderRef) -> Self {
        Self {
            handle,
            config,
            transcoder,
            state: None,
        }
    }

    /// Returns the device's entity id.
    #[must_use]
    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Returns the device configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the current state, `None` while unknown.
    #[must_use]
    pub fn state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    /// Returns a state change notification for this device.
    #[must_use]
    pub fn update(&self) -> DeviceUpdate {
        DeviceUpdate {
            handle: self.handle.clone(),
            name: self.config.name.clone(),
            platform: self.config.kind.platform().to_string(),
            state: self.state.clone(),
        }
    }

    // ===== Bus traffic =====

    /// Processes a telegram addressed to one of this device's group
    /// addresses.
    ///
    /// Writes and responses update the state; a read request on the
    /// write address is answered from known state when the device is
    /// configured to respond. Returns whether the state changed and any
    /// response telegrams to send.
    pub fn on_telegram(
        &mut self,
        telegram: &Telegram,
        own_address: IndividualAddress,
    ) -> (bool, Vec<Telegram>) {
        match &telegram.payload {
            TelegramPayload::GroupValueWrite(payload)
            | TelegramPayload::GroupValueResponse(payload) => {
                let decoded = match self.transcoder.decode(payload) {
                    Ok(value) => self.apply_invert(value),
                    Err(error) => {
                        warn!(
                            device = %self.handle,
                            destination = %telegram.destination,
                            transcoder = self.transcoder.name(),
                            %error,
                            "device ignored undecodable payload",
                        );
                        return (false, Vec::new());
                    }
                };
                let Some(value) = self.value_from_bus(decoded) else {
                    return (false, Vec::new());
                };
                let changed = self.state.as_ref() != Some(&value);
                self.state = Some(value);
                (changed, Vec::new())
            }
            TelegramPayload::GroupValueRead => (false, self.answer_read(telegram, own_address)),
        }
    }

    fn answer_read(&self, telegram: &Telegram, own_address: IndividualAddress) -> Vec<Telegram> {
        let DeviceKind::Switch {
            respond_to_read: true,
            ..
        } = self.config.kind
        else {
            return Vec::new();
        };
        if self.config.ga_write != Some(telegram.destination) {
            return Vec::new();
        }
        let Some(state) = &self.state else {
            return Vec::new();
        };
        match self.transcoder.encode(&self.apply_invert(state.clone())) {
            Ok(payload) => vec![Telegram::response(own_address, telegram.destination, payload)],
            Err(error) => {
                warn!(device = %self.handle, %error, "cannot encode state for read response");
                Vec::new()
            }
        }
    }

    // ===== Commands =====

    /// Applies a user command, returning the telegrams to send.
    ///
    /// The state is updated optimistically; the bridge publishes the
    /// resulting update alongside the bus writes.
    ///
    /// # Errors
    ///
    /// Fails for read-only platforms and for values the device's
    /// transcoder cannot encode.
    pub fn apply_command(
        &mut self,
        value: &Value,
        own_address: IndividualAddress,
    ) -> Result<Vec<Telegram>> {
        let destination = self.config.ga_write.ok_or_else(|| {
            Error::Config(ConfigError::MissingField("ga_write".to_string()))
        })?;
        let outgoing = match &self.config.kind {
            DeviceKind::BinarySensor { .. } | DeviceKind::Sensor { .. } => {
                return Err(Error::Config(ConfigError::Inconsistent(format!(
                    "{} devices accept no commands",
                    self.config.kind.platform()
                ))));
            }
            DeviceKind::Scene { scene_number } => {
                // scene numbers are 1-based, the wire value 0-based
                let payload = self.transcoder.encode(&Value::from(scene_number - 1))?;
                self.state = Some(Value::from(*scene_number));
                vec![Telegram::write(own_address, destination, payload)]
            }
            DeviceKind::Button { payload } => {
                vec![Telegram::write(
                    own_address,
                    destination,
                    crate::telegram::TelegramValue::Bit(*payload),
                )]
            }
            DeviceKind::Fan { max_step } => {
                let value = max_step.map_or_else(
                    || value.clone(),
                    |steps| snap_percentage(value, steps),
                );
                let payload = self.transcoder.encode(&value)?;
                self.state = Some(value);
                vec![Telegram::write(own_address, destination, payload)]
            }
            DeviceKind::Select { options } => {
                let Some(option) = value.as_str() else {
                    return Err(Error::Config(ConfigError::invalid(
                        "option",
                        "expected an option name",
                    )));
                };
                let Some(raw) = options.get(option) else {
                    return Err(Error::Config(ConfigError::invalid(
                        "option",
                        format!("unknown option {option:?}"),
                    )));
                };
                let payload = self.transcoder.encode(&Value::from(*raw))?;
                self.state = Some(value.clone());
                vec![Telegram::write(own_address, destination, payload)]
            }
            DeviceKind::Switch { .. }
            | DeviceKind::Text
            | DeviceKind::Notify
            | DeviceKind::Date
            | DeviceKind::DateTime => {
                let payload = self.transcoder.encode(&self.apply_invert(value.clone()))?;
                self.state = Some(value.clone());
                vec![Telegram::write(own_address, destination, payload)]
            }
        };
        Ok(outgoing)
    }

    // ===== State restoration =====

    /// Seeds the state from a persisted snapshot.
    ///
    /// Only devices without a readable state address take the seed, and
    /// only while their state is still unknown; anything else is synced
    /// from the bus instead.
    pub fn seed_state(&mut self, value: Value) -> bool {
        if self.config.readable() || self.state.is_some() {
            return false;
        }
        self.state = Some(value);
        true
    }

    /// Returns the startup read request for the state address, if this
    /// device is configured to sync.
    #[must_use]
    pub fn sync_request(&self, own_address: IndividualAddress) -> Option<Telegram> {
        if !self.config.sync_state {
            return None;
        }
        self.config
            .ga_state
            .map(|address| Telegram::read(own_address, address))
    }

    /// Maps a decoded wire value to the device's state domain.
    ///
    /// Select devices report the option name assigned to the raw
    /// payload; an unassigned payload is logged and dropped. All other
    /// kinds pass the decoded value through.
    fn value_from_bus(&self, value: Value) -> Option<Value> {
        let DeviceKind::Select { options } = &self.config.kind else {
            return Some(value);
        };
        let raw = value.as_u64()?;
        let option = options
            .iter()
            .find(|(_, payload)| u64::from(**payload) == raw)
            .map(|(name, _)| Value::String(name.clone()));
        if option.is_none() {
            warn!(device = %self.handle, raw, "payload not assigned to any option");
        }
        option
    }

    fn apply_invert(&self, value: Value) -> Value {
        let inverted = match self.config.kind {
            DeviceKind::Switch { invert, .. } | DeviceKind::BinarySensor { invert } => invert,
            _ => false,
        };
        match (inverted, value) {
            (true, Value::Bool(flag)) => Value::Bool(!flag),
            (_, value) => value,
        }
    }
}

fn snap_percentage(value: &Value, steps: u8) -> Value {
    let Some(percent) = value.as_f64() else {
        return value.clone();
    };
    let step_size = 100.0 / f64::from(steps);
    let snapped = (percent / step_size).round() * step_size;
    Value::from((snapped * 10.0).round() / 10.0)
}
