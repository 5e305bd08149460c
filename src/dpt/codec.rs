// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in transcoder implementations.
//!
//! The set mirrors the datapoint types the bridge ships support for:
//! 1-bit switching, scaled and unscaled 1-byte values, 2-byte unsigned,
//! the 2-byte KNX float (temperature, humidity), 14-byte strings, 3-byte
//! dates, and a raw passthrough.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{Value, json};

use crate::error::TranscoderError;
use crate::telegram::TelegramValue;

use super::Transcoder;

/// Extracts a byte payload of exactly `expected` bytes.
fn expect_bytes<'a>(
    name: &str,
    payload: &'a TelegramValue,
    expected: usize,
) -> Result<&'a [u8], TranscoderError> {
    match payload {
        TelegramValue::Bit(_) => Err(TranscoderError::payload_length(name, expected, 0)),
        TelegramValue::Bytes(bytes) if bytes.len() == expected => Ok(bytes),
        TelegramValue::Bytes(bytes) => {
            Err(TranscoderError::payload_length(name, expected, bytes.len()))
        }
    }
}

/// Extracts a finite f64 from a JSON value.
fn expect_number(name: &str, value: &Value) -> Result<f64, TranscoderError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TranscoderError::conversion(name, format!("expected a number, got {value}")))
}

/// 1-bit boolean codec (DPT 1.001).
#[derive(Debug, Default)]
pub struct SwitchCodec;

impl Transcoder for SwitchCodec {
    fn name(&self) -> &str {
        "switch"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        match payload {
            TelegramValue::Bit(0) => Ok(json!(false)),
            TelegramValue::Bit(1) => Ok(json!(true)),
            TelegramValue::Bit(other) => Err(TranscoderError::conversion(
                self.name(),
                format!("bit value {other} is not a boolean"),
            )),
            TelegramValue::Bytes(bytes) => {
                Err(TranscoderError::payload_length(self.name(), 0, bytes.len()))
            }
        }
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        match value.as_bool() {
            Some(true) => Ok(TelegramValue::Bit(1)),
            Some(false) => Ok(TelegramValue::Bit(0)),
            None => Err(TranscoderError::conversion(
                self.name(),
                format!("expected a boolean, got {value}"),
            )),
        }
    }
}

/// Scaled 1-byte percentage codec: raw 0-255 maps to 0-100 %.
#[derive(Debug, Default)]
pub struct PercentU8Codec;

impl Transcoder for PercentU8Codec {
    fn name(&self) -> &str {
        "percentU8"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 1)?;
        let percent = f64::from(bytes[0]) * 100.0 / 255.0;
        // one decimal place is all the wire resolution carries
        Ok(json!((percent * 10.0).round() / 10.0))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let percent = expect_number(self.name(), value)?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(TranscoderError::conversion(
                self.name(),
                format!("percentage {percent} is out of range [0, 100]"),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = (percent * 255.0 / 100.0).round() as u8;
        Ok(TelegramValue::Bytes(vec![raw]))
    }
}

/// Unscaled 1-byte unsigned codec (DPT 5.010).
#[derive(Debug, Default)]
pub struct U8Codec;

impl Transcoder for U8Codec {
    fn name(&self) -> &str {
        "1byte_unsigned"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 1)?;
        Ok(json!(bytes[0]))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let number = value.as_u64().ok_or_else(|| {
            TranscoderError::conversion(self.name(), format!("expected an integer, got {value}"))
        })?;
        let raw = u8::try_from(number).map_err(|_| {
            TranscoderError::conversion(self.name(), format!("{number} is out of range [0, 255]"))
        })?;
        Ok(TelegramValue::Bytes(vec![raw]))
    }
}

/// 2-byte unsigned codec (DPT 7.001), big-endian.
#[derive(Debug, Default)]
pub struct U16Codec;

impl Transcoder for U16Codec {
    fn name(&self) -> &str {
        "2byte_unsigned"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 2)?;
        Ok(json!(u16::from_be_bytes([bytes[0], bytes[1]])))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let number = value.as_u64().ok_or_else(|| {
            TranscoderError::conversion(self.name(), format!("expected an integer, got {value}"))
        })?;
        let raw = u16::try_from(number).map_err(|_| {
            TranscoderError::conversion(self.name(), format!("{number} is out of range [0, 65535]"))
        })?;
        Ok(TelegramValue::Bytes(raw.to_be_bytes().to_vec()))
    }
}

/// 2-byte KNX float codec (DPT 9.xxx).
///
/// Wire layout: sign bit, 4-bit exponent, 11-bit two's-complement
/// mantissa; resolution 0.01. Covers roughly ±670760.
#[derive(Debug)]
pub struct Float16Codec {
    name: &'static str,
}

impl Float16Codec {
    /// Temperature codec (DPT 9.001).
    #[must_use]
    pub const fn temperature() -> Self {
        Self { name: "temperature" }
    }

    /// Relative humidity codec (DPT 9.007).
    #[must_use]
    pub const fn humidity() -> Self {
        Self { name: "humidity" }
    }
}

impl Transcoder for Float16Codec {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 2)?;
        let exponent = (bytes[0] >> 3) & 0x0F;
        let mut mantissa = (i32::from(bytes[0] & 0x07) << 8) | i32::from(bytes[1]);
        if bytes[0] & 0x80 != 0 {
            mantissa -= 2048;
        }
        let value = f64::from(mantissa) * 0.01 * f64::from(1u32 << exponent);
        Ok(json!((value * 100.0).round() / 100.0))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let number = expect_number(self.name(), value)?;
        let mut mantissa = number * 100.0;
        let mut exponent = 0u16;
        while !(-2048.0..=2047.0).contains(&mantissa) {
            mantissa /= 2.0;
            exponent += 1;
            if exponent > 15 {
                return Err(TranscoderError::conversion(
                    self.name(),
                    format!("{number} is out of the representable range"),
                ));
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        let mantissa = mantissa.round() as i16;
        let sign = if mantissa < 0 { 0x8000 } else { 0 };
        #[allow(clippy::cast_sign_loss)]
        let raw = sign | (exponent << 11) | ((mantissa as u16) & 0x07FF);
        Ok(TelegramValue::Bytes(raw.to_be_bytes().to_vec()))
    }
}

/// 14-byte latin-1 string codec (DPT 16.001), NUL padded.
#[derive(Debug, Default)]
pub struct LatinStringCodec;

impl LatinStringCodec {
    const LENGTH: usize = 14;
}

impl Transcoder for LatinStringCodec {
    fn name(&self) -> &str {
        "string"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, Self::LENGTH)?;
        let text: String = bytes
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| char::from(byte))
            .collect();
        Ok(json!(text))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let text = value.as_str().ok_or_else(|| {
            TranscoderError::conversion(self.name(), format!("expected a string, got {value}"))
        })?;
        let mut bytes = Vec::with_capacity(Self::LENGTH);
        for ch in text.chars() {
            let code = u32::from(ch);
            let byte = u8::try_from(code).map_err(|_| {
                TranscoderError::conversion(
                    self.name(),
                    format!("character {ch:?} is not latin-1"),
                )
            })?;
            bytes.push(byte);
        }
        if bytes.len() > Self::LENGTH {
            return Err(TranscoderError::conversion(
                self.name(),
                format!("string exceeds {} bytes", Self::LENGTH),
            ));
        }
        bytes.resize(Self::LENGTH, 0);
        Ok(TelegramValue::Bytes(bytes))
    }
}

/// 3-byte date codec (DPT 11.001).
///
/// Years 0-89 map to 2000-2089, years 90-99 to 1990-1999. Values are
/// ISO `YYYY-MM-DD` strings on the typed side.
#[derive(Debug, Default)]
pub struct DateCodec;

impl Transcoder for DateCodec {
    fn name(&self) -> &str {
        "date"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 3)?;
        let day = u32::from(bytes[0] & 0x1F);
        let month = u32::from(bytes[1] & 0x0F);
        let short_year = i32::from(bytes[2] & 0x7F);
        let year = if short_year >= 90 { 1900 + short_year } else { 2000 + short_year };
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            TranscoderError::conversion(
                self.name(),
                format!("{year:04}-{month:02}-{day:02} is not a valid date"),
            )
        })?;
        Ok(json!(date.format("%Y-%m-%d").to_string()))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let text = value.as_str().ok_or_else(|| {
            TranscoderError::conversion(self.name(), format!("expected a date string, got {value}"))
        })?;
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|err| {
            TranscoderError::conversion(self.name(), format!("{text}: {err}"))
        })?;
        let year = date.year();
        if !(1990..=2089).contains(&year) {
            return Err(TranscoderError::conversion(
                self.name(),
                format!("year {year} is out of range [1990, 2089]"),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let short_year = (year % 100) as u8;
        #[allow(clippy::cast_possible_truncation)]
        let (day, month) = (date.day() as u8, date.month() as u8);
        Ok(TelegramValue::Bytes(vec![day, month, short_year]))
    }
}

/// 8-byte date and time codec (DPT 19.001).
///
/// Wire layout: year offset from 1900, month, day, day-of-week packed
/// with the hour, minutes, seconds, and two status bytes (sent as
/// zero). Values are ISO `YYYY-MM-DDTHH:MM:SS` strings on the typed
/// side.
#[derive(Debug, Default)]
pub struct DateTimeCodec;

impl Transcoder for DateTimeCodec {
    fn name(&self) -> &str {
        "datetime"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        let bytes = expect_bytes(self.name(), payload, 8)?;
        let year = 1900 + i32::from(bytes[0]);
        let month = u32::from(bytes[1] & 0x0F);
        let day = u32::from(bytes[2] & 0x1F);
        let hour = u32::from(bytes[3] & 0x1F);
        let minute = u32::from(bytes[4] & 0x3F);
        let second = u32::from(bytes[5] & 0x3F);
        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                TranscoderError::conversion(
                    self.name(),
                    format!(
                        "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid date and time"
                    ),
                )
            })?;
        Ok(json!(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()))
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        let text = value.as_str().ok_or_else(|| {
            TranscoderError::conversion(
                self.name(),
                format!("expected a date-time string, got {value}"),
            )
        })?;
        let datetime = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").map_err(|err| {
            TranscoderError::conversion(self.name(), format!("{text}: {err}"))
        })?;
        let year = datetime.year();
        if !(1900..=2155).contains(&year) {
            return Err(TranscoderError::conversion(
                self.name(),
                format!("year {year} is out of range [1900, 2155]"),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let year_offset = (year - 1900) as u8;
        #[allow(clippy::cast_possible_truncation)]
        let weekday = datetime.weekday().number_from_monday() as u8;
        #[allow(clippy::cast_possible_truncation)]
        let (month, day) = (datetime.month() as u8, datetime.day() as u8);
        #[allow(clippy::cast_possible_truncation)]
        let (hour, minute, second) = (
            datetime.hour() as u8,
            datetime.minute() as u8,
            datetime.second() as u8,
        );
        Ok(TelegramValue::Bytes(vec![
            year_offset,
            month,
            day,
            (weekday << 5) | hour,
            minute,
            second,
            0,
            0,
        ]))
    }
}

/// Passthrough codec exposing the raw payload unchanged.
#[derive(Debug, Default)]
pub struct RawCodec;

impl Transcoder for RawCodec {
    fn name(&self) -> &str {
        "raw"
    }

    fn decode(&self, payload: &TelegramValue) -> Result<Value, TranscoderError> {
        match payload {
            TelegramValue::Bit(bit) => Ok(json!(bit)),
            TelegramValue::Bytes(bytes) => Ok(json!(bytes)),
        }
    }

    fn encode(&self, value: &Value) -> Result<TelegramValue, TranscoderError> {
        if let Some(number) = value.as_u64() {
            let bit = u8::try_from(number)
                .ok()
                .filter(|&bit| bit <= TelegramValue::BIT_MAX)
                .ok_or_else(|| {
                    TranscoderError::conversion(
                        self.name(),
                        format!("{number} does not fit a 6-bit payload"),
                    )
                })?;
            return Ok(TelegramValue::Bit(bit));
        }
        if let Some(items) = value.as_array() {
            let bytes = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| {
                            TranscoderError::conversion(
                                self.name(),
                                format!("{item} is not a byte"),
                            )
                        })
                })
                .collect::<Result<Vec<u8>, _>>()?;
            return Ok(TelegramValue::Bytes(bytes));
        }
        Err(TranscoderError::conversion(
            self.name(),
            format!("expected an integer or byte array, got {value}"),
        ))
    }
}
