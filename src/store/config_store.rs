// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted store of device entity configurations.
//!
//! Entities live in one JSON document keyed by entity id. Every mutation
//! validates the payload, persists the document atomically, and only
//! then reports success, so the in-memory view never runs ahead of disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::device::{DeviceConfig, DeviceHandle};
use crate::error::{ConfigStoreError, Result};
use crate::telegram::write_atomic;

/// One stored entity: its id, platform and raw configuration data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigStoreEntry {
    /// Entity id, `platform.uuid`.
    pub entity_id: DeviceHandle,
    /// Platform name, e.g. `switch`.
    pub platform: String,
    /// Raw configuration payload as submitted.
    pub data: Value,
}

impl ConfigStoreEntry {
    /// Parses the stored payload into a validated device config.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the underlying payload.
    pub fn device_config(&self) -> Result<DeviceConfig> {
        Ok(DeviceConfig::from_value(&self.platform, &self.data)
            .map_err(ConfigStoreError::Validation)?)
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Document {
    entities: BTreeMap<String, StoredEntity>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntity {
    platform: String,
    data: Value,
}

/// The persisted entity store.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    entities: BTreeMap<DeviceHandle, ConfigStoreEntry>,
}

impl ConfigStore {
    /// Creates an empty store backed by the given document path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entities: BTreeMap::new(),
        }
    }

    /// Loads the document from disk.
    ///
    /// A missing file is normal on first start.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed; a
    /// corrupt store is surfaced rather than silently emptied, since it
    /// holds user configuration.
    pub async fn load(&mut self) -> Result<()> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no entity store document");
                return Ok(());
            }
            Err(error) => return Err(ConfigStoreError::Persistence(error).into()),
        };
        let document: Document = serde_json::from_slice(&bytes)
            .map_err(|error| ConfigStoreError::Corrupt(error.to_string()))?;
        self.entities = document
            .entities
            .into_iter()
            .map(|(entity_id, stored)| {
                let handle = DeviceHandle::from_entity_id(entity_id);
                let entry = ConfigStoreEntry {
                    entity_id: handle.clone(),
                    platform: stored.platform,
                    data: stored.data,
                };
                (handle, entry)
            })
            .collect();
        info!(entities = self.entities.len(), "loaded entity store");
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let document = Document {
            entities: self
                .entities
                .iter()
                .map(|(handle, entry)| {
                    (
                        handle.to_string(),
                        StoredEntity {
                            platform: entry.platform.clone(),
                            data: entry.data.clone(),
                        },
                    )
                })
                .collect(),
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|error| ConfigStoreError::Corrupt(error.to_string()))?;
        write_atomic(&self.path, &bytes).await?;
        debug!(entities = self.entities.len(), "persisted entity store");
        Ok(())
    }

    // ===== CRUD =====

    /// Creates a new entity, assigning it a fresh id.
    ///
    /// The payload is validated and the document persisted before the
    /// new id is returned.
    ///
    /// # Errors
    ///
    /// Fails on invalid payloads and on persistence errors; neither
    /// leaves a partial entry behind.
    pub async fn create(&mut self, platform: &str, data: Value) -> Result<ConfigStoreEntry> {
        DeviceConfig::from_value(platform, &data).map_err(ConfigStoreError::Validation)?;
        let handle = DeviceHandle::generate(platform);
        let entry = ConfigStoreEntry {
            entity_id: handle.clone(),
            platform: platform.to_string(),
            data,
        };
        self.entities.insert(handle.clone(), entry.clone());
        if let Err(error) = self.persist().await {
            self.entities.remove(&handle);
            return Err(error);
        }
        info!(entity = %handle, "created entity");
        Ok(entry)
    }

    /// Replaces an entity's configuration data in full.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, invalid payloads and persistence errors.
    /// On failure the previous configuration stays in place.
    pub async fn update(&mut self, handle: &DeviceHandle, data: Value) -> Result<ConfigStoreEntry> {
        let Some(existing) = self.entities.get(handle) else {
            return Err(ConfigStoreError::UnknownEntity(handle.to_string()).into());
        };
        DeviceConfig::from_value(&existing.platform, &data).map_err(ConfigStoreError::Validation)?;
        let previous = existing.clone();
        let entry = ConfigStoreEntry {
            entity_id: handle.clone(),
            platform: previous.platform.clone(),
            data,
        };
        self.entities.insert(handle.clone(), entry.clone());
        if let Err(error) = self.persist().await {
            self.entities.insert(handle.clone(), previous);
            return Err(error);
        }
        info!(entity = %handle, "updated entity");
        Ok(entry)
    }

    /// Deletes an entity.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and on persistence errors; a failed
    /// persist restores the entry.
    pub async fn delete(&mut self, handle: &DeviceHandle) -> Result<()> {
        let Some(previous) = self.entities.remove(handle) else {
            warn!(entity = %handle, "delete of unknown entity");
            return Err(ConfigStoreError::UnknownEntity(handle.to_string()).into());
        };
        if let Err(error) = self.persist().await {
            self.entities.insert(handle.clone(), previous);
            return Err(error);
        }
        info!(entity = %handle, "deleted entity");
        Ok(())
    }

    /// Returns the entity for `handle`.
    #[must_use]
    pub fn get(&self, handle: &DeviceHandle) -> Option<&ConfigStoreEntry> {
        self.entities.get(handle)
    }

    /// Returns all entities in id order.
    #[must_use]
    pub fn list(&self) -> Vec<&ConfigStoreEntry> {
        self.entities.values().collect()
    }

    /// Returns the number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
