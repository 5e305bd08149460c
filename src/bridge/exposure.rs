// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exposures: host values published to the bus.
//!
//! An exposure mirrors a value owned by the host application onto one
//! group address. The bridge encodes each published value, remembers
//! the last raw payload, and can answer read requests for the address
//! from it.

use serde_json::Value;

use crate::address::{GroupAddress, IndividualAddress};
use crate::dpt::TranscoderRef;
use crate::error::Result;
use crate::telegram::{Telegram, TelegramValue};

/// One group address the host publishes a value to.
#[derive(Debug)]
pub struct Exposure {
    address: GroupAddress,
    transcoder: TranscoderRef,
    respond_to_read: bool,
    last: Option<TelegramValue>,
}

impl Exposure {
    /// Creates an exposure with no published value yet.
    #[must_use]
    pub fn new(address: GroupAddress, transcoder: TranscoderRef, respond_to_read: bool) -> Self {
        Self {
            address,
            transcoder,
            respond_to_read,
            last: None,
        }
    }

    /// Returns the exposed group address.
    #[must_use]
    pub fn address(&self) -> GroupAddress {
        self.address
    }

    /// Returns the transcoder name used for this exposure.
    #[must_use]
    pub fn value_type(&self) -> &str {
        self.transcoder.name()
    }

    /// Encodes a new value, remembers it, and returns the write
    /// telegram to send.
    ///
    /// # Errors
    ///
    /// Fails when the value is outside the transcoder's domain; the
    /// previously published value is kept in that case.
    pub fn publish(&mut self, value: &Value, own_address: IndividualAddress) -> Result<Telegram> {
        let payload = self.transcoder.encode(value)?;
        self.last = Some(payload.clone());
        Ok(Telegram::write(own_address, self.address, payload))
    }

    /// Answers a read request from the last published value, if this
    /// exposure responds to reads and a value is known.
    #[must_use]
    pub fn answer_read(&self, own_address: IndividualAddress) -> Option<Telegram> {
        if !self.respond_to_read {
            return None;
        }
        self.last
            .clone()
            .map(|payload| Telegram::response(own_address, self.address, payload))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::dpt::Float16Codec;
    use crate::telegram::TelegramPayload;

    use super::*;

    fn own() -> IndividualAddress {
        "1.0.250".parse().unwrap()
    }

    #[test]
    fn publish_encodes_and_remembers() {
        let mut exposure = Exposure::new(
            "4/0/17".parse().unwrap(),
            Arc::new(Float16Codec::temperature()),
            true,
        );
        assert!(exposure.answer_read(own()).is_none());

        let telegram = exposure.publish(&json!(21.0), own()).unwrap();
        assert_eq!(
            telegram.payload,
            TelegramPayload::GroupValueWrite(TelegramValue::Bytes(vec![0x0C, 0x1A]))
        );

        let answer = exposure.answer_read(own()).unwrap();
        assert_eq!(
            answer.payload,
            TelegramPayload::GroupValueResponse(TelegramValue::Bytes(vec![0x0C, 0x1A]))
        );
    }

    #[test]
    fn failed_publish_keeps_previous_value() {
        let mut exposure = Exposure::new(
            "4/0/17".parse().unwrap(),
            Arc::new(Float16Codec::temperature()),
            true,
        );
        exposure.publish(&json!(21.0), own()).unwrap();
        assert!(exposure.publish(&json!("warm"), own()).is_err());

        let answer = exposure.answer_read(own()).unwrap();
        assert_eq!(
            answer.payload,
            TelegramPayload::GroupValueResponse(TelegramValue::Bytes(vec![0x0C, 0x1A]))
        );
    }

    #[test]
    fn silent_exposure_never_answers() {
        let mut exposure = Exposure::new(
            "4/0/17".parse().unwrap(),
            Arc::new(Float16Codec::temperature()),
            false,
        );
        exposure.publish(&json!(21.0), own()).unwrap();
        assert!(exposure.answer_read(own()).is_none());
    }
}
