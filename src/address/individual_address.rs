// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Individual address type for telegram sources.
//!
//! Individual addresses identify a single bus participant in the
//! `area.line.device` form (4/4/8 bits).

use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// A KNX individual address, normalized to its raw 16-bit encoding.
///
/// # Examples
///
/// ```
/// use knxr_lib::address::IndividualAddress;
///
/// let ia: IndividualAddress = "1.1.4".parse().unwrap();
/// assert_eq!(ia.area(), 1);
/// assert_eq!(ia.line(), 1);
/// assert_eq!(ia.device(), 4);
/// assert_eq!(ia.to_string(), "1.1.4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndividualAddress(u16);

impl IndividualAddress {
    /// Maximum value of the area segment (4 bits).
    pub const AREA_MAX: u16 = 15;

    /// Maximum value of the line segment (4 bits).
    pub const LINE_MAX: u16 = 15;

    /// Maximum value of the device segment (8 bits).
    pub const DEVICE_MAX: u16 = 255;

    /// Creates an individual address from its raw 16-bit encoding.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Creates an individual address from `area.line.device` segments.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::SegmentOutOfRange` if a segment exceeds its
    /// bit width (area 0-15, line 0-15, device 0-255).
    pub fn new(area: u16, line: u16, device: u16) -> Result<Self, AddressError> {
        if area > Self::AREA_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "area",
                max: Self::AREA_MAX,
                actual: u32::from(area),
            });
        }
        if line > Self::LINE_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "line",
                max: Self::LINE_MAX,
                actual: u32::from(line),
            });
        }
        if device > Self::DEVICE_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "device",
                max: Self::DEVICE_MAX,
                actual: u32::from(device),
            });
        }
        Ok(Self((area << 12) | (line << 8) | device))
    }

    /// Returns the raw 16-bit encoding.
    #[must_use]
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Returns the area segment (0-15).
    #[must_use]
    pub const fn area(&self) -> u16 {
        self.0 >> 12
    }

    /// Returns the line segment (0-15).
    #[must_use]
    pub const fn line(&self) -> u16 {
        (self.0 >> 8) & 0x0F
    }

    /// Returns the device segment (0-255).
    #[must_use]
    pub const fn device(&self) -> u16 {
        self.0 & 0xFF
    }
}

impl Default for IndividualAddress {
    /// The unassigned address `0.0.0`, used before the wire layer reports
    /// the tunnel endpoint.
    fn default() -> Self {
        Self(0)
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidIndividualAddress(s.to_string());

        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [free] => {
                let raw: u16 = free.trim().parse().map_err(|_| invalid())?;
                Ok(Self(raw))
            }
            [area, line, device] => {
                let area: u16 = area.trim().parse().map_err(|_| invalid())?;
                let line: u16 = line.trim().parse().map_err(|_| invalid())?;
                let device: u16 = device.trim().parse().map_err(|_| invalid())?;
                Self::new(area, line, device)
            }
            _ => Err(invalid()),
        }
    }
}

impl serde::Serialize for IndividualAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for IndividualAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
