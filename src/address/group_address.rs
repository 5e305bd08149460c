// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Group address type for bus destinations.
//!
//! A group address is a 16-bit bus destination identifier. The canonical
//! textual form is 3-level `main/middle/sub` (5/3/8 bits), but free-form
//! numeric input is accepted as well. Equality and hashing operate on the
//! normalized raw encoding, so the same address written either way is one
//! mapping key.

use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// A KNX group address, normalized to its raw 16-bit encoding.
///
/// # Examples
///
/// ```
/// use knxr_lib::address::GroupAddress;
///
/// let ga: GroupAddress = "1/2/3".parse().unwrap();
/// assert_eq!(ga.main(), 1);
/// assert_eq!(ga.middle(), 2);
/// assert_eq!(ga.sub(), 3);
///
/// // Free-form numeric input normalizes to the same key
/// let raw: GroupAddress = "2563".parse().unwrap();
/// assert_eq!(ga, raw);
/// assert_eq!(ga.to_string(), "1/2/3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupAddress(u16);

impl GroupAddress {
    /// Maximum value of the main group segment (5 bits).
    pub const MAIN_MAX: u16 = 31;

    /// Maximum value of the middle group segment (3 bits).
    pub const MIDDLE_MAX: u16 = 7;

    /// Maximum value of the sub group segment (8 bits).
    pub const SUB_MAX: u16 = 255;

    /// Creates a group address from its raw 16-bit encoding.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Creates a group address from 3-level segments.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::SegmentOutOfRange` if a segment exceeds its
    /// bit width (main 0-31, middle 0-7, sub 0-255).
    pub fn new(main: u16, middle: u16, sub: u16) -> Result<Self, AddressError> {
        if main > Self::MAIN_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "main",
                max: Self::MAIN_MAX,
                actual: u32::from(main),
            });
        }
        if middle > Self::MIDDLE_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "middle",
                max: Self::MIDDLE_MAX,
                actual: u32::from(middle),
            });
        }
        if sub > Self::SUB_MAX {
            return Err(AddressError::SegmentOutOfRange {
                segment: "sub",
                max: Self::SUB_MAX,
                actual: u32::from(sub),
            });
        }
        Ok(Self((main << 11) | (middle << 8) | sub))
    }

    /// Returns the raw 16-bit encoding.
    #[must_use]
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Returns the main group segment (0-31).
    #[must_use]
    pub const fn main(&self) -> u16 {
        self.0 >> 11
    }

    /// Returns the middle group segment (0-7).
    #[must_use]
    pub const fn middle(&self) -> u16 {
        (self.0 >> 8) & 0x07
    }

    /// Returns the sub group segment (0-255).
    #[must_use]
    pub const fn sub(&self) -> u16 {
        self.0 & 0xFF
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.middle(), self.sub())
    }
}

impl FromStr for GroupAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidGroupAddress(s.to_string());

        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [free] => {
                let raw: u16 = free.trim().parse().map_err(|_| invalid())?;
                Ok(Self(raw))
            }
            [main, middle, sub] => {
                let main: u16 = main.trim().parse().map_err(|_| invalid())?;
                let middle: u16 = middle.trim().parse().map_err(|_| invalid())?;
                let sub: u16 = sub.trim().parse().map_err(|_| invalid())?;
                Self::new(main, middle, sub)
            }
            _ => Err(invalid()),
        }
    }
}

impl From<GroupAddress> for u16 {
    fn from(address: GroupAddress) -> Self {
        address.raw()
    }
}

impl serde::Serialize for GroupAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for GroupAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = GroupAddress;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a group address string or raw u16")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(serde::de::Error::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u16::try_from(v)
                    .map(GroupAddress::from_raw)
                    .map_err(|_| serde::de::Error::custom("group address out of u16 range"))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_level_parse() {
        let ga: GroupAddress = "1/2/3".parse().unwrap();
        assert_eq!(ga.main(), 1);
        assert_eq!(ga.middle(), 2);
        assert_eq!(ga.sub(), 3);
        assert_eq!(ga.raw(), (1 << 11) | (2 << 8) | 3);
    }

    #[test]
    fn free_form_parse() {
        let ga: GroupAddress = "2563".parse().unwrap();
        assert_eq!(ga, "1/2/3".parse().unwrap());
    }

    #[test]
    fn display_is_three_level() {
        assert_eq!(GroupAddress::new(31, 7, 255).unwrap().to_string(), "31/7/255");
        assert_eq!(GroupAddress::from_raw(0).to_string(), "0/0/0");
    }

    #[test]
    fn segment_bounds_checked() {
        assert!(matches!(
            GroupAddress::new(32, 0, 0),
            Err(AddressError::SegmentOutOfRange { segment: "main", .. })
        ));
        assert!(matches!(
            GroupAddress::new(0, 8, 0),
            Err(AddressError::SegmentOutOfRange { segment: "middle", .. })
        ));
        assert!(matches!(
            GroupAddress::new(0, 0, 256),
            Err(AddressError::SegmentOutOfRange { segment: "sub", .. })
        ));
    }

    #[test]
    fn invalid_strings_rejected() {
        assert!("".parse::<GroupAddress>().is_err());
        assert!("1/2".parse::<GroupAddress>().is_err());
        assert!("1/2/3/4".parse::<GroupAddress>().is_err());
        assert!("a/b/c".parse::<GroupAddress>().is_err());
        assert!("70000".parse::<GroupAddress>().is_err());
    }

    #[test]
    fn equality_and_hash_by_raw() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert("1/2/3".parse::<GroupAddress>().unwrap(), "bound");
        assert_eq!(map.get(&"2563".parse::<GroupAddress>().unwrap()), Some(&"bound"));
    }

    #[test]
    fn serde_round_trip() {
        let ga: GroupAddress = "4/0/17".parse().unwrap();
        let json = serde_json::to_string(&ga).unwrap();
        assert_eq!(json, "\"4/0/17\"");
        let back: GroupAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ga);
    }

    #[test]
    fn serde_accepts_raw_number() {
        let ga: GroupAddress = serde_json::from_str("2563").unwrap();
        assert_eq!(ga.to_string(), "1/2/3");
    }
}
