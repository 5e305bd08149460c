// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command front-end over the bridge.
//!
//! Requests carry a caller-chosen correlation id and a tagged command;
//! every request gets exactly one response echoing that id, either a
//! result or a stable error code with a human-readable message. The
//! transport (a websocket, a unix socket, a test harness) stays outside
//! this crate.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::address::GroupAddress;
use crate::bridge::KnxBridge;
use crate::device::DeviceHandle;
use crate::error::{ConfigStoreError, Error};

/// One command request with its correlation id.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRequest {
    /// Caller-chosen correlation id, echoed in the response.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: ServiceCommand,
}

/// A single value or a list of them; service payloads accept both
/// spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// The commands of the service surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceCommand {
    /// Bridge identity and connection state.
    Info,
    /// Send a value, one telegram per destination address.
    Send {
        destination: OneOrMany<GroupAddress>,
        payload: Value,
        #[serde(default)]
        value_type: Option<String>,
        /// Send response telegrams instead of writes.
        #[serde(default)]
        response: bool,
    },
    /// Send a read request per destination address.
    Read { destination: OneOrMany<GroupAddress> },
    /// Register or remove event filter bindings.
    EventRegister {
        pattern: OneOrMany<String>,
        #[serde(default = "default_value_type")]
        value_type: String,
        #[serde(default)]
        remove: bool,
    },
    /// Register or remove an exposure.
    ExposureRegister {
        destination: GroupAddress,
        #[serde(default = "default_value_type")]
        value_type: String,
        #[serde(default)]
        respond_to_read: bool,
        #[serde(default)]
        remove: bool,
    },
    /// Publish a host value through a registered exposure.
    ExposurePublish {
        destination: GroupAddress,
        payload: Value,
    },
    /// Apply a user command to a device.
    DeviceCommand {
        entity_id: DeviceHandle,
        payload: Value,
    },
    /// Create a stored entity.
    CreateEntity { platform: String, data: Value },
    /// Replace a stored entity's configuration.
    UpdateEntity { entity_id: DeviceHandle, data: Value },
    /// Delete a stored entity.
    DeleteEntity { entity_id: DeviceHandle },
    /// Fetch a stored entity's configuration.
    GetEntityConfig { entity_id: DeviceHandle },
    /// List all stored entities.
    ListEntities,
    /// Fetch recent telegrams, most recent first.
    RecentTelegrams {
        #[serde(default = "default_telegram_count")]
        count: usize,
    },
}

fn default_value_type() -> String {
    "raw".to_string()
}

fn default_telegram_count() -> usize {
    100
}

/// Response to one [`ServiceRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse {
    /// Correlation id of the request.
    pub id: u64,
    /// Whether the command succeeded.
    pub success: bool,
    /// Command result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error details on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

/// Stable error code plus message.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceError {
    /// Machine-readable error code.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ServiceResponse {
    fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn fail(id: u64, error: &Error) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(ServiceError {
                code: error_code(error),
                message: error.to_string(),
            }),
        }
    }
}

/// Maps library errors to the stable codes of the service surface.
fn error_code(error: &Error) -> &'static str {
    match error {
        Error::NotLoaded => "not_loaded",
        Error::NotConnected => "not_connected",
        Error::DeviceNotFound(_) | Error::Store(ConfigStoreError::UnknownEntity(_)) => "not_found",
        Error::Address(_)
        | Error::Transcoder(_)
        | Error::Config(_)
        | Error::Store(ConfigStoreError::Validation(_)) => "validation_error",
        Error::Store(_) => "store_error",
        Error::ChannelClosed(_) => "unknown_error",
    }
}

/// Executes service commands against a bridge.
pub struct ServiceHandler<'a> {
    bridge: &'a KnxBridge,
}

impl<'a> ServiceHandler<'a> {
    /// Creates a handler over the given bridge.
    #[must_use]
    pub fn new(bridge: &'a KnxBridge) -> Self {
        Self { bridge }
    }

    /// Executes one request, producing exactly one response.
    pub async fn handle(&self, request: ServiceRequest) -> ServiceResponse {
        let id = request.id;
        debug!(id, command = ?request.command, "service request");
        match self.execute(request.command).await {
            Ok(result) => ServiceResponse::ok(id, result),
            Err(error) => ServiceResponse::fail(id, &error),
        }
    }

    async fn execute(&self, command: ServiceCommand) -> crate::error::Result<Value> {
        match command {
            ServiceCommand::Info => Ok(json!({
                "own_address": self.bridge.own_address().to_string(),
                "started": self.bridge.is_started(),
                "connected": *self.bridge.connected().borrow(),
            })),
            ServiceCommand::Send {
                destination,
                payload,
                value_type,
                response,
            } => {
                for address in destination.into_vec() {
                    self.bridge
                        .send(address, &payload, value_type.as_deref(), response)
                        .await?;
                }
                Ok(Value::Null)
            }
            ServiceCommand::Read { destination } => {
                for address in destination.into_vec() {
                    self.bridge.read(address).await?;
                }
                Ok(Value::Null)
            }
            ServiceCommand::EventRegister {
                pattern,
                value_type,
                remove,
            } => {
                if remove {
                    let mut removed = false;
                    for pattern in pattern.into_vec() {
                        removed |= self.bridge.remove_event_filter(&pattern)?;
                    }
                    Ok(json!({ "removed": removed }))
                } else {
                    for pattern in pattern.into_vec() {
                        self.bridge.register_event_filter(&pattern, &value_type)?;
                    }
                    Ok(Value::Null)
                }
            }
            ServiceCommand::ExposureRegister {
                destination,
                value_type,
                respond_to_read,
                remove,
            } => {
                if remove {
                    let removed = self.bridge.remove_exposure(destination).await?;
                    Ok(json!({ "removed": removed }))
                } else {
                    self.bridge
                        .register_exposure(destination, &value_type, respond_to_read)
                        .await?;
                    Ok(Value::Null)
                }
            }
            ServiceCommand::ExposurePublish {
                destination,
                payload,
            } => {
                self.bridge.publish_exposure(destination, &payload).await?;
                Ok(Value::Null)
            }
            ServiceCommand::DeviceCommand { entity_id, payload } => {
                self.bridge.send_command(&entity_id, &payload).await?;
                Ok(Value::Null)
            }
            ServiceCommand::CreateEntity { platform, data } => {
                let entry = self.bridge.create_entity(&platform, data).await?;
                Ok(serde_json::to_value(entry).unwrap_or_default())
            }
            ServiceCommand::UpdateEntity { entity_id, data } => {
                let entry = self.bridge.update_entity(&entity_id, data).await?;
                Ok(serde_json::to_value(entry).unwrap_or_default())
            }
            ServiceCommand::DeleteEntity { entity_id } => {
                self.bridge.delete_entity(&entity_id).await?;
                Ok(Value::Null)
            }
            ServiceCommand::GetEntityConfig { entity_id } => {
                let entry = self.bridge.get_entity(&entity_id).await?;
                Ok(serde_json::to_value(entry).unwrap_or_default())
            }
            ServiceCommand::ListEntities => {
                let entries = self.bridge.list_entities().await?;
                Ok(serde_json::to_value(entries).unwrap_or_default())
            }
            ServiceCommand::RecentTelegrams { count } => {
                let records = self.bridge.recent_telegrams(count).await?;
                Ok(serde_json::to_value(records).unwrap_or_default())
            }
        }
    }
}
