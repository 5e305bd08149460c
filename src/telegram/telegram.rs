// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw bus telegram types.
//!
//! A telegram is one discrete message on the bus: source, destination,
//! payload, direction and receive timestamp. Telegrams are immutable once
//! created; the wire layer produces incoming ones and consumes outgoing
//! ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{GroupAddress, IndividualAddress};

/// Raw payload value carried by a write or response telegram.
///
/// Small values (up to 6 bits) travel embedded in the APCI octet as
/// [`TelegramValue::Bit`]; anything larger is a separate byte sequence,
/// [`TelegramValue::Bytes`]. The distinction is part of the wire format
/// and of the untyped `send` service contract: an integer payload is sent
/// as a bit value, a byte list as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelegramValue {
    /// APCI-embedded small payload (0-63).
    Bit(u8),
    /// Explicit payload bytes.
    Bytes(Vec<u8>),
}

impl TelegramValue {
    /// Maximum value representable in the APCI-embedded form.
    pub const BIT_MAX: u8 = 0x3F;

    /// Returns the payload as a byte slice, if it is the byte form.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bit(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }

    /// Returns the payload length in bytes (bit values count as zero).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bit(_) => 0,
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    /// Returns `true` for an empty byte payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Bytes(bytes) if bytes.is_empty())
    }
}

/// Application payload of a telegram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "apci", content = "value")]
pub enum TelegramPayload {
    /// Write a group value.
    GroupValueWrite(TelegramValue),
    /// Answer to a previous read request.
    GroupValueResponse(TelegramValue),
    /// Request the current group value.
    GroupValueRead,
}

impl TelegramPayload {
    /// Returns the carried value for write and response payloads.
    ///
    /// Read requests carry no value.
    #[must_use]
    pub fn value(&self) -> Option<&TelegramValue> {
        match self {
            Self::GroupValueWrite(value) | Self::GroupValueResponse(value) => Some(value),
            Self::GroupValueRead => None,
        }
    }

    /// Returns the payload type name as used in event records.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GroupValueWrite(_) => "GroupValueWrite",
            Self::GroupValueResponse(_) => "GroupValueResponse",
            Self::GroupValueRead => "GroupValueRead",
        }
    }
}

/// Direction of a telegram relative to this bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the bus.
    Incoming,
    /// Sent by this bridge.
    Outgoing,
}

/// One discrete message on the bus.
///
/// # Examples
///
/// ```
/// use knxr_lib::telegram::{Telegram, TelegramValue};
///
/// let telegram = Telegram::write(
///     "1.1.4".parse().unwrap(),
///     "1/2/3".parse().unwrap(),
///     TelegramValue::Bit(1),
/// );
/// assert_eq!(telegram.payload.type_name(), "GroupValueWrite");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telegram {
    /// The sending bus participant.
    pub source: IndividualAddress,
    /// The group address the telegram is addressed to.
    pub destination: GroupAddress,
    /// The application payload.
    pub payload: TelegramPayload,
    /// Direction relative to this bridge.
    pub direction: Direction,
    /// Receive or send timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Telegram {
    /// Creates an outgoing group value write telegram.
    #[must_use]
    pub fn write(source: IndividualAddress, destination: GroupAddress, value: TelegramValue) -> Self {
        Self::new(source, destination, TelegramPayload::GroupValueWrite(value), Direction::Outgoing)
    }

    /// Creates an outgoing group value response telegram.
    #[must_use]
    pub fn response(
        source: IndividualAddress,
        destination: GroupAddress,
        value: TelegramValue,
    ) -> Self {
        Self::new(
            source,
            destination,
            TelegramPayload::GroupValueResponse(value),
            Direction::Outgoing,
        )
    }

    /// Creates an outgoing group value read request.
    #[must_use]
    pub fn read(source: IndividualAddress, destination: GroupAddress) -> Self {
        Self::new(source, destination, TelegramPayload::GroupValueRead, Direction::Outgoing)
    }

    /// Creates a telegram with the current timestamp.
    #[must_use]
    pub fn new(
        source: IndividualAddress,
        destination: GroupAddress,
        payload: TelegramPayload,
        direction: Direction,
    ) -> Self {
        Self {
            source,
            destination,
            payload,
            direction,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_value_for_write_and_response() {
        let write = TelegramPayload::GroupValueWrite(TelegramValue::Bit(1));
        assert_eq!(write.value(), Some(&TelegramValue::Bit(1)));

        let response = TelegramPayload::GroupValueResponse(TelegramValue::Bytes(vec![0x80]));
        assert_eq!(response.value(), Some(&TelegramValue::Bytes(vec![0x80])));

        assert_eq!(TelegramPayload::GroupValueRead.value(), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(
            TelegramPayload::GroupValueWrite(TelegramValue::Bit(0)).type_name(),
            "GroupValueWrite"
        );
        assert_eq!(TelegramPayload::GroupValueRead.type_name(), "GroupValueRead");
    }

    #[test]
    fn value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&TelegramValue::Bit(1)).unwrap(), "1");
        assert_eq!(
            serde_json::to_string(&TelegramValue::Bytes(vec![1, 2])).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn constructors_set_direction() {
        let source = "1.1.1".parse().unwrap();
        let destination = "1/2/3".parse().unwrap();

        let write = Telegram::write(source, destination, TelegramValue::Bit(1));
        assert_eq!(write.direction, Direction::Outgoing);

        let read = Telegram::read(source, destination);
        assert_eq!(read.payload, TelegramPayload::GroupValueRead);
    }

    #[test]
    fn telegram_serde_round_trip() {
        let telegram = Telegram::write(
            "1.1.1".parse().unwrap(),
            "4/0/17".parse().unwrap(),
            TelegramValue::Bytes(vec![0x0C, 0x1A]),
        );
        let json = serde_json::to_string(&telegram).unwrap();
        let back: Telegram = serde_json::from_str(&json).unwrap();
        assert_eq!(back.destination, telegram.destination);
        assert_eq!(back.payload, telegram.payload);
    }
}
