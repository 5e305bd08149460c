// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telegram-to-event translation.
//!
//! The translator keeps two kinds of bindings: exact group addresses
//! mapped to a transcoder, and ordered address filters each paired with
//! one. An exact binding always wins; filters are consulted in
//! registration order and the first match decides.

use std::collections::HashMap;

use tracing::warn;

use crate::address::{AddressFilter, GroupAddress};
use crate::dpt::TranscoderRef;

use super::event::TelegramEvent;
use super::telegram::Telegram;

/// Resolves transcoders for group addresses and turns raw telegrams into
/// typed [`TelegramEvent`] records.
#[derive(Debug, Default)]
pub struct TelegramTranslator {
    direct: HashMap<GroupAddress, TranscoderRef>,
    filters: Vec<(AddressFilter, TranscoderRef)>,
}

impl TelegramTranslator {
    /// Creates an empty translator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Bindings =====

    /// Binds a transcoder to an exact group address, replacing any
    /// previous binding for that address.
    pub fn bind_address(&mut self, address: GroupAddress, transcoder: TranscoderRef) {
        self.direct.insert(address, transcoder);
    }

    /// Removes the exact binding for `address`, returning whether one
    /// existed.
    pub fn remove_address(&mut self, address: GroupAddress) -> bool {
        self.direct.remove(&address).is_some()
    }

    /// Appends a filter binding. Filters are matched in the order they
    /// were added.
    pub fn bind_filter(&mut self, filter: AddressFilter, transcoder: TranscoderRef) {
        self.filters.push((filter, transcoder));
    }

    /// Removes all bindings with the given filter pattern, returning
    /// whether any existed. Remaining filters keep their relative order.
    pub fn remove_filter(&mut self, filter: &AddressFilter) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(bound, _)| bound != filter);
        self.filters.len() != before
    }

    /// Returns the transcoder for `address`: the exact binding if one
    /// exists, otherwise the first matching filter.
    #[must_use]
    pub fn resolve(&self, address: GroupAddress) -> Option<&TranscoderRef> {
        if let Some(transcoder) = self.direct.get(&address) {
            return Some(transcoder);
        }
        self.filters
            .iter()
            .find(|(filter, _)| filter.matches(address))
            .map(|(_, transcoder)| transcoder)
    }

    // ===== Translation =====

    /// Translates a telegram into an event record.
    ///
    /// Write and response payloads are decoded through the resolved
    /// transcoder. A decode failure is logged and surfaces as a null
    /// value; it never fails the inbound path.
    #[must_use]
    pub fn translate(&self, telegram: &Telegram) -> TelegramEvent {
        let data = telegram.payload.value().cloned();
        let transcoder = self.resolve(telegram.destination);
        let decoder = transcoder.map(|t| t.name().to_string());

        let value = match (transcoder, &data) {
            (Some(transcoder), Some(payload)) => match transcoder.decode(payload) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(
                        destination = %telegram.destination,
                        source = %telegram.source,
                        transcoder = transcoder.name(),
                        %error,
                        "failed to decode telegram payload",
                    );
                    None
                }
            },
            _ => None,
        };

        TelegramEvent {
            destination: telegram.destination,
            source: telegram.source,
            direction: telegram.direction,
            telegramtype: telegram.payload.type_name().to_string(),
            data,
            value,
            decoder,
            timestamp: telegram.timestamp,
        }
    }
}
