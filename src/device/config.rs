// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validated device configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::GroupAddress;
use crate::error::ConfigError;

/// Platform-specific behavior of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum DeviceKind {
    /// A switchable actuator.
    Switch {
        /// Invert the boolean value on the wire.
        #[serde(default)]
        invert: bool,
        /// Answer read requests on the write address from known state.
        #[serde(default)]
        respond_to_read: bool,
    },
    /// A read-only boolean input.
    BinarySensor {
        #[serde(default)]
        invert: bool,
    },
    /// A read-only typed value input.
    Sensor {
        /// Registered transcoder name for the value, e.g. `temperature`.
        value_type: String,
    },
    /// A fan controlled by a scaled percentage.
    Fan {
        /// When set, percentages snap to this many discrete steps.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_step: Option<u8>,
    },
    /// A scene trigger sending a fixed scene number.
    Scene {
        /// Scene number 1-64 as configured in the installation.
        scene_number: u8,
    },
    /// A stateless button sending a fixed payload.
    Button {
        /// Raw payload to send, 0-63.
        #[serde(default = "default_button_payload")]
        payload: u8,
    },
    /// A writable 14-byte text display.
    Text,
    /// A send-only text notification target.
    Notify,
    /// A date value.
    Date,
    /// A combined date and time value.
    #[serde(rename = "datetime")]
    DateTime,
    /// A named option mapped to a fixed raw payload.
    Select {
        /// Option name to raw wire payload, e.g. `{"eco": 0, "comfort": 1}`.
        options: BTreeMap<String, u8>,
    },
}

fn default_button_payload() -> u8 {
    1
}

impl DeviceKind {
    /// Returns the platform name this kind is stored under.
    #[must_use]
    pub fn platform(&self) -> &'static str {
        match self {
            Self::Switch { .. } => "switch",
            Self::BinarySensor { .. } => "binary_sensor",
            Self::Sensor { .. } => "sensor",
            Self::Fan { .. } => "fan",
            Self::Scene { .. } => "scene",
            Self::Button { .. } => "button",
            Self::Text => "text",
            Self::Notify => "notify",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Select { .. } => "select",
        }
    }

    /// Returns the transcoder name used for this kind's values.
    #[must_use]
    pub fn transcoder_name(&self) -> &str {
        match self {
            Self::Switch { .. } | Self::BinarySensor { .. } | Self::Button { .. } => "switch",
            Self::Sensor { value_type } => value_type,
            Self::Fan { .. } => "percentU8",
            Self::Scene { .. } => "1byte_unsigned",
            Self::Text | Self::Notify => "string",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Select { .. } => "1byte_unsigned",
        }
    }
}

/// Validated configuration of one device.
///
/// # Examples
///
/// ```
/// use knxr_lib::device::DeviceConfig;
/// use serde_json::json;
///
/// let config = DeviceConfig::from_value(
///     "switch",
///     &json!({"name": "Kitchen", "ga_write": "1/2/3", "ga_state": "1/2/4"}),
/// )
/// .unwrap();
/// assert!(config.readable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name.
    pub name: String,
    /// Platform behavior and its options.
    #[serde(flatten)]
    pub kind: DeviceKind,
    /// Group address commands are written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_write: Option<GroupAddress>,
    /// Group address state is reported on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_state: Option<GroupAddress>,
    /// Additional listen-only addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ga_passive: Vec<GroupAddress>,
    /// Issue a read request for the state address at startup.
    #[serde(default)]
    pub sync_state: bool,
}

impl DeviceConfig {
    /// Parses and validates a device configuration from stored data.
    ///
    /// `platform` selects the [`DeviceKind`]; `data` carries the name,
    /// addresses and kind-specific options as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown platforms, malformed fields,
    /// or configurations that violate the platform's address rules.
    pub fn from_value(platform: &str, data: &Value) -> Result<Self, ConfigError> {
        let Some(object) = data.as_object() else {
            return Err(ConfigError::invalid("data", "expected an object"));
        };
        known_platform(platform)?;

        let mut merged = object.clone();
        merged.insert("platform".to_string(), Value::String(platform.to_string()));
        let config: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|error| ConfigError::invalid("data", error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the address rules for this device's kind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Inconsistent` when the address layout does
    /// not fit the platform.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if self.ga_write.is_none() && self.ga_state.is_none() && self.ga_passive.is_empty() {
            return Err(ConfigError::Inconsistent(
                "at least one group address is required".to_string(),
            ));
        }
        match &self.kind {
            DeviceKind::Switch { .. } => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
                if self.ga_write.is_some() && self.ga_write == self.ga_state {
                    return Err(ConfigError::Inconsistent(
                        "state address must differ from write address".to_string(),
                    ));
                }
            }
            DeviceKind::BinarySensor { .. }
            | DeviceKind::Sensor { .. }
            | DeviceKind::Date
            | DeviceKind::DateTime => {
                if self.ga_state.is_none() && self.ga_passive.is_empty() {
                    return Err(ConfigError::MissingField("ga_state".to_string()));
                }
            }
            DeviceKind::Fan { max_step } => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
                if let Some(step) = max_step {
                    if !(1..=100).contains(step) {
                        return Err(ConfigError::invalid(
                            "max_step",
                            "must be between 1 and 100",
                        ));
                    }
                }
            }
            DeviceKind::Scene { scene_number } => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
                if !(1..=64).contains(scene_number) {
                    return Err(ConfigError::invalid(
                        "scene_number",
                        "must be between 1 and 64",
                    ));
                }
            }
            DeviceKind::Button { payload } => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
                if *payload > crate::telegram::TelegramValue::BIT_MAX {
                    return Err(ConfigError::invalid("payload", "must fit 6 bits"));
                }
            }
            DeviceKind::Text | DeviceKind::Notify => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
            }
            DeviceKind::Select { options } => {
                if self.ga_write.is_none() {
                    return Err(ConfigError::MissingField("ga_write".to_string()));
                }
                if options.is_empty() {
                    return Err(ConfigError::invalid("options", "must not be empty"));
                }
            }
        }
        Ok(())
    }

    /// Returns every group address this device listens on.
    #[must_use]
    pub fn listened_addresses(&self) -> Vec<GroupAddress> {
        let mut addresses = Vec::new();
        if let Some(address) = self.ga_write {
            addresses.push(address);
        }
        if let Some(address) = self.ga_state {
            addresses.push(address);
        }
        addresses.extend(self.ga_passive.iter().copied());
        addresses
    }

    /// Returns `true` when the device has a readable state address.
    #[must_use]
    pub fn readable(&self) -> bool {
        self.ga_state.is_some()
    }
}

fn known_platform(platform: &str) -> Result<(), ConfigError> {
    const PLATFORMS: [&str; 11] = [
        "switch",
        "binary_sensor",
        "sensor",
        "fan",
        "scene",
        "button",
        "text",
        "notify",
        "date",
        "datetime",
        "select",
    ];
    if PLATFORMS.contains(&platform) {
        Ok(())
    } else {
        Err(ConfigError::UnknownPlatform(platform.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn switch_parses_with_defaults() {
        let config = DeviceConfig::from_value(
            "switch",
            &json!({"name": "Kitchen", "ga_write": "1/2/3"}),
        )
        .unwrap();
        assert_eq!(
            config.kind,
            DeviceKind::Switch {
                invert: false,
                respond_to_read: false
            }
        );
        assert_eq!(config.kind.transcoder_name(), "switch");
        assert!(!config.readable());
    }

    #[test]
    fn unknown_platform_rejected() {
        let error = DeviceConfig::from_value("lawnmower", &json!({"name": "x"})).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownPlatform(p) if p == "lawnmower"));
    }

    #[test]
    fn switch_requires_write_address() {
        let error = DeviceConfig::from_value(
            "switch",
            &json!({"name": "Kitchen", "ga_state": "1/2/4"}),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::MissingField(f) if f == "ga_write"));
    }

    #[test]
    fn switch_rejects_equal_write_and_state() {
        let error = DeviceConfig::from_value(
            "switch",
            &json!({"name": "Kitchen", "ga_write": "1/2/3", "ga_state": "1/2/3"}),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn at_least_one_address_required() {
        let error = DeviceConfig::from_value("notify", &json!({"name": "Alerts"})).unwrap_err();
        assert!(matches!(error, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn sensor_uses_configured_value_type() {
        let config = DeviceConfig::from_value(
            "sensor",
            &json!({"name": "Outdoor", "value_type": "temperature", "ga_state": "4/0/17"}),
        )
        .unwrap();
        assert_eq!(config.kind.transcoder_name(), "temperature");
        assert!(config.readable());
    }

    #[test]
    fn datetime_serde_tag_and_transcoder() {
        let config = DeviceConfig::from_value(
            "datetime",
            &json!({"name": "Wall clock", "ga_state": "0/0/1", "sync_state": true}),
        )
        .unwrap();
        assert_eq!(config.kind, DeviceKind::DateTime);
        assert_eq!(config.kind.transcoder_name(), "datetime");
        assert_eq!(serde_json::to_value(&config).unwrap()["platform"], "datetime");
    }

    #[test]
    fn select_requires_options() {
        let error = DeviceConfig::from_value(
            "select",
            &json!({"name": "Mode", "ga_write": "2/1/0", "options": {}}),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { .. }));

        let config = DeviceConfig::from_value(
            "select",
            &json!({"name": "Mode", "ga_write": "2/1/0", "options": {"eco": 0, "comfort": 1}}),
        )
        .unwrap();
        assert_eq!(config.kind.transcoder_name(), "1byte_unsigned");
    }

    #[test]
    fn scene_number_range_checked() {
        let error = DeviceConfig::from_value(
            "scene",
            &json!({"name": "Movie", "ga_write": "2/0/1", "scene_number": 65}),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn listened_addresses_collects_all() {
        let config = DeviceConfig::from_value(
            "switch",
            &json!({
                "name": "Kitchen",
                "ga_write": "1/2/3",
                "ga_state": "1/2/4",
                "ga_passive": ["1/2/5", "1/2/6"],
            }),
        )
        .unwrap();
        let addresses: Vec<String> = config
            .listened_addresses()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(addresses, vec!["1/2/3", "1/2/4", "1/2/5", "1/2/6"]);
    }

    #[test]
    fn config_round_trips_through_store_shape() {
        let config = DeviceConfig::from_value(
            "fan",
            &json!({"name": "Bath", "ga_write": "3/1/0", "max_step": 3}),
        )
        .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["platform"], "fan");
        let back = DeviceConfig::from_value("fan", &value).unwrap();
        assert_eq!(back, config);
    }
}
