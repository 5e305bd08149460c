// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value transcoders between raw bus payloads and typed values.
//!
//! A [`Transcoder`] is a named codec pairing `decode` and `encode` over
//! [`TelegramValue`](crate::telegram::TelegramValue) payloads. The
//! [`TranscoderRegistry`] maps type names to codecs and is pre-populated
//! with the built-in set; service calls may extend it at runtime.

mod codec;
mod registry;

pub use codec::{
    DateCodec, DateTimeCodec, Float16Codec, LatinStringCodec, PercentU8Codec, RawCodec,
    SwitchCodec, U8Codec, U16Codec,
};
pub use registry::TranscoderRegistry;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::TranscoderError;
use crate::telegram::TelegramValue;

/// A named codec converting between raw bus payloads and typed values.
///
/// Decoded values are represented as [`serde_json::Value`] so they flow
/// directly into event records, history snapshots and the service
/// surface without a second mapping layer.
pub trait Transcoder: fmt::Debug + Send + Sync {
    /// Returns the type name this codec is registered under.
    fn name(&self) -> &str;

    /// Decodes a raw payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `TranscoderError::PayloadLength` when the payload length
    /// does not match the declared type, and `TranscoderError::Conversion`
    /// when the bytes are malformed for it.
    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError>;

    /// Encodes a typed value into a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `TranscoderError::Conversion` when the value is outside
    /// the codec's domain.
    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError>;
}

/// Shared handle to a transcoder.
pub type TranscoderRef = Arc<dyn Transcoder>;
