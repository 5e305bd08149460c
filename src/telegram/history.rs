// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded telegram history with best-effort persistence.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

use super::event::TelegramEvent;

/// One history entry: a translated event with a monotonic sequence
/// number assigned at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic sequence number, unique within one store file.
    pub seq: u64,
    /// The translated event.
    pub event: TelegramEvent,
}

/// Bounded buffer of the most recent telegram events.
///
/// Appending beyond the capacity evicts the oldest record. The buffer
/// can be snapshotted to disk and restored across restarts; a missing
/// or unreadable snapshot starts the buffer empty rather than failing
/// startup.
#[derive(Debug)]
pub struct TelegramHistory {
    path: PathBuf,
    capacity: usize,
    records: VecDeque<HistoryRecord>,
    next_seq: u64,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    next_seq: u64,
    records: Vec<HistoryRecord>,
}

impl TelegramHistory {
    /// Creates an empty history backed by the given snapshot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            records: VecDeque::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Appends an event, evicting the oldest records when full.
    ///
    /// A zero-capacity history keeps nothing but still advances the
    /// sequence counter.
    pub fn append(&mut self, event: TelegramEvent) {
        let record = HistoryRecord {
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Returns up to `count` records, most recent first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<HistoryRecord> {
        self.records.iter().rev().take(count).cloned().collect()
    }

    /// Returns the number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no records are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads the snapshot from disk.
    ///
    /// A missing file is normal on first start; a corrupt one is logged
    /// and discarded. Either way the buffer starts empty.
    pub async fn load(&mut self) {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no telegram history snapshot");
                return;
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to read telegram history");
                return;
            }
        };
        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                self.next_seq = snapshot.next_seq;
                self.records = snapshot
                    .records
                    .into_iter()
                    .rev()
                    .take(self.capacity)
                    .rev()
                    .collect();
                debug!(records = self.records.len(), "restored telegram history");
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "corrupt telegram history snapshot");
            }
        }
    }

    /// Writes the snapshot to disk, replacing the previous one
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the snapshot cannot be written.
    pub async fn save(&self) -> Result<()> {
        let snapshot = Snapshot {
            next_seq: self.next_seq,
            records: self.records.iter().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|error| std::io::Error::other(error.to_string()))
            .map_err(crate::error::ConfigStoreError::Persistence)?;
        write_atomic(&self.path, &bytes).await?;
        debug!(records = self.records.len(), path = %self.path.display(), "saved telegram history");
        Ok(())
    }
}

/// Writes `bytes` to `path` via a temporary sibling file and rename, so
/// a crash mid-write never leaves a truncated snapshot behind.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let persist = |error: std::io::Error| crate::error::ConfigStoreError::Persistence(error);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(persist)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await.map_err(persist)?;
    tokio::fs::rename(&tmp, path).await.map_err(persist)?;
    Ok(())
}
