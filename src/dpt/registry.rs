// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime registry of value transcoders.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::TranscoderError;

use super::codec::{
    DateCodec, DateTimeCodec, Float16Codec, LatinStringCodec, PercentU8Codec, RawCodec,
    SwitchCodec, U8Codec, U16Codec,
};
use super::TranscoderRef;

/// Maps value type names to their codecs.
///
/// The registry starts with the built-in codec set and may be extended
/// at runtime. Lookups are cheap shared-lock reads; registration is the
/// only writer.
///
/// # Examples
///
/// ```
/// use knxr_lib::dpt::TranscoderRegistry;
///
/// let registry = TranscoderRegistry::with_defaults();
/// assert!(registry.lookup("temperature").is_some());
/// assert!(registry.lookup("no_such_type").is_none());
/// ```
#[derive(Debug)]
pub struct TranscoderRegistry {
    codecs: RwLock<HashMap<String, TranscoderRef>>,
}

impl TranscoderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry pre-populated with the built-in codecs.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(SwitchCodec));
        registry.register(Arc::new(PercentU8Codec));
        registry.register(Arc::new(U8Codec));
        registry.register(Arc::new(U16Codec));
        registry.register(Arc::new(Float16Codec::temperature()));
        registry.register(Arc::new(Float16Codec::humidity()));
        registry.register(Arc::new(LatinStringCodec));
        registry.register(Arc::new(DateCodec));
        registry.register(Arc::new(DateTimeCodec));
        registry.register(Arc::new(RawCodec));
        registry
    }

    /// Registers a codec under its own name, replacing any previous one.
    pub fn register(&self, codec: TranscoderRef) {
        let name = codec.name().to_string();
        debug!(transcoder = %name, "registering transcoder");
        self.codecs.write().insert(name, codec);
    }

    /// Looks up a codec by type name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TranscoderRef> {
        self.codecs.read().get(name).cloned()
    }

    /// Looks up a codec by type name, failing on unknown names.
    ///
    /// # Errors
    ///
    /// Returns `TranscoderError::UnknownType` when no codec is registered
    /// under `name`.
    pub fn parse(&self, name: &str) -> Result<TranscoderRef, TranscoderError> {
        self.lookup(name)
            .ok_or_else(|| TranscoderError::UnknownType(name.to_string()))
    }
}

impl Default for TranscoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::telegram::TelegramValue;

    use super::super::Transcoder;
    use super::*;

    #[test]
    fn defaults_cover_builtin_types() {
        let registry = TranscoderRegistry::with_defaults();
        for name in [
            "switch",
            "percentU8",
            "1byte_unsigned",
            "2byte_unsigned",
            "temperature",
            "humidity",
            "string",
            "date",
            "datetime",
            "raw",
        ] {
            assert!(registry.lookup(name).is_some(), "missing codec {name}");
        }
    }

    #[test]
    fn parse_rejects_unknown_type() {
        let registry = TranscoderRegistry::with_defaults();
        assert!(matches!(
            registry.parse("bogus"),
            Err(TranscoderError::UnknownType(name)) if name == "bogus"
        ));
    }

    #[test]
    fn register_replaces_existing() {
        #[derive(Debug)]
        struct AlwaysOn;

        impl Transcoder for AlwaysOn {
            fn name(&self) -> &str {
                "switch"
            }

            fn decode(&self, _payload: &TelegramValue) -> Result<Value, TranscoderError> {
                Ok(json!(true))
            }

            fn encode(&self, _value: &Value) -> Result<TelegramValue, TranscoderError> {
                Ok(TelegramValue::Bit(1))
            }
        }

        let registry = TranscoderRegistry::with_defaults();
        registry.register(Arc::new(AlwaysOn));
        let codec = registry.lookup("switch").unwrap();
        assert_eq!(codec.decode(&TelegramValue::Bit(0)).unwrap(), json!(true));
    }
}
