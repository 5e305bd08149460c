// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `KnxR` library.
//!
//! This module provides the error hierarchy for failures across the
//! library: address parsing, payload transcoding, device configuration,
//! config-store mutations, and bridge lifecycle violations.

use thiserror::Error;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when bridging
/// the KNX bus.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while parsing a bus address or address filter.
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Error occurred while encoding or decoding a payload.
    #[error("transcoder error: {0}")]
    Transcoder(#[from] TranscoderError),

    /// A device configuration is structurally invalid or inconsistent.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A config-store mutation violated an invariant.
    #[error("config store error: {0}")]
    Store(#[from] ConfigStoreError),

    /// The bridge has not been started, or has already been stopped.
    #[error("bridge is not loaded")]
    NotLoaded,

    /// The bus connection is down; state-changing operations are suppressed.
    #[error("bus is not connected")]
    NotConnected,

    /// Device was not found in the registry.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing group addresses, individual addresses and
/// address filters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The group address string could not be parsed.
    #[error("invalid group address: {0}")]
    InvalidGroupAddress(String),

    /// The individual address string could not be parsed.
    #[error("invalid individual address: {0}")]
    InvalidIndividualAddress(String),

    /// The address filter pattern could not be parsed.
    #[error("invalid address filter: {0}")]
    InvalidFilter(String),

    /// An address segment is outside its allowed range.
    #[error("address segment {segment} value {actual} is out of range [0, {max}]")]
    SegmentOutOfRange {
        /// Name of the offending segment (`main`, `middle`, `sub`, ...).
        segment: &'static str,
        /// Maximum allowed value for the segment.
        max: u16,
        /// The actual value that was provided.
        actual: u32,
    },
}

/// Errors related to encoding and decoding payloads per a declared type.
///
/// In telegram-delivery paths these are recovered locally (logged, null
/// decoded value). In user-initiated send paths they propagate to the
/// caller as validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranscoderError {
    /// A value is outside the codec's domain, or the payload bytes are
    /// malformed for the declared type.
    #[error("{transcoder}: {message}")]
    Conversion {
        /// Name of the transcoder that rejected the value.
        transcoder: String,
        /// Description of the conversion failure.
        message: String,
    },

    /// The payload length does not match the declared type.
    #[error("{transcoder}: payload length {actual} does not match expected {expected}")]
    PayloadLength {
        /// Name of the transcoder that rejected the payload.
        transcoder: String,
        /// Expected payload length in bytes.
        expected: usize,
        /// Actual payload length in bytes.
        actual: usize,
    },

    /// No transcoder is registered under the requested type name.
    #[error("unknown transcoder type: {0}")]
    UnknownType(String),
}

impl TranscoderError {
    /// Creates a conversion error for the given transcoder.
    pub(crate) fn conversion(transcoder: &str, message: impl Into<String>) -> Self {
        Self::Conversion {
            transcoder: transcoder.to_string(),
            message: message.into(),
        }
    }

    /// Creates a payload length error for the given transcoder.
    pub(crate) fn payload_length(transcoder: &str, expected: usize, actual: usize) -> Self {
        Self::PayloadLength {
            transcoder: transcoder.to_string(),
            expected,
            actual,
        }
    }
}

/// Errors related to device configuration blobs.
///
/// These are always surfaced to the caller and never partially applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing from the configuration blob.
    #[error("missing field in configuration: {0}")]
    MissingField(String),

    /// A field holds a value of the wrong shape or outside its domain.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// The field that failed validation.
        field: String,
        /// Description of the validation failure.
        message: String,
    },

    /// Two configuration values are mutually inconsistent.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),

    /// The platform name does not map to a known device kind.
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

impl ConfigError {
    /// Creates an invalid-value error for the given field.
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Errors related to config-store mutations.
///
/// The store is left unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    /// The supplied configuration blob failed structural validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ConfigError),

    /// No entity is stored under the given id.
    #[error("entity not found: {0}")]
    UnknownEntity(String),

    /// An entity already exists under the given id.
    #[error("entity already exists: {0}")]
    DuplicateEntity(String),

    /// Persisting the store document failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] std::io::Error),

    /// The persisted store document could not be parsed.
    #[error("store document corrupt: {0}")]
    Corrupt(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
