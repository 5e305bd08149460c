// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed telegram events produced by the translator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::{GroupAddress, IndividualAddress};

use super::telegram::{Direction, TelegramValue};

/// A telegram after translation, as delivered to subscribers and kept in
/// the history buffer.
///
/// `data` is the raw payload (absent for read requests), `value` the
/// decoded typed value when a transcoder was resolved and decoding
/// succeeded. A resolved transcoder with a failed decode yields
/// `decoder` set and `value` null, so consumers can see that translation
/// was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramEvent {
    /// Destination group address.
    pub destination: GroupAddress,
    /// Sending bus participant.
    pub source: IndividualAddress,
    /// Direction relative to this bridge.
    pub direction: Direction,
    /// Payload type name, e.g. `GroupValueWrite`.
    pub telegramtype: String,
    /// Raw payload, if the telegram carried one.
    pub data: Option<TelegramValue>,
    /// Decoded value, if a transcoder applied and succeeded.
    pub value: Option<Value>,
    /// Name of the transcoder that was resolved, if any.
    pub decoder: Option<String>,
    /// Receive or send timestamp.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_serializes_with_flat_fields() {
        let event = TelegramEvent {
            destination: "1/2/3".parse().unwrap(),
            source: "1.1.4".parse().unwrap(),
            direction: Direction::Incoming,
            telegramtype: "GroupValueWrite".to_string(),
            data: Some(TelegramValue::Bit(1)),
            value: Some(json!(true)),
            decoder: Some("switch".to_string()),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["destination"], "1/2/3");
        assert_eq!(json["source"], "1.1.4");
        assert_eq!(json["direction"], "incoming");
        assert_eq!(json["data"], 1);
        assert_eq!(json["value"], true);
    }

    #[test]
    fn read_request_event_has_no_data() {
        let event = TelegramEvent {
            destination: "1/2/3".parse().unwrap(),
            source: "1.1.4".parse().unwrap(),
            direction: Direction::Incoming,
            telegramtype: "GroupValueRead".to_string(),
            data: None,
            value: None,
            decoder: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["value"], serde_json::Value::Null);
    }
}
