// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Address filters for matching sets of group addresses.
//!
//! A filter is a pattern over the 3-level textual form of a group
//! address. Each level may be an exact number, the `*` wildcard, or an
//! inclusive range `a-b` (with open ends: `-b` and `a-`). A single `*`
//! matches every address.
//!
//! # Examples
//!
//! ```
//! use knxr_lib::address::{AddressFilter, GroupAddress};
//!
//! let filter: AddressFilter = "1/2/*".parse().unwrap();
//! assert!(filter.matches("1/2/5".parse::<GroupAddress>().unwrap()));
//! assert!(!filter.matches("1/3/5".parse::<GroupAddress>().unwrap()));
//!
//! let ranged: AddressFilter = "1/2-4/10-".parse().unwrap();
//! assert!(ranged.matches("1/3/200".parse::<GroupAddress>().unwrap()));
//! assert!(!ranged.matches("1/3/9".parse::<GroupAddress>().unwrap()));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

use super::GroupAddress;

/// A pattern over group addresses.
///
/// Filters compare by their source pattern text, so the same pattern
/// registered twice is recognized as equal when removing bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFilter {
    pattern: String,
    levels: FilterLevels,
}

/// Parsed filter shape: a single pattern over the raw encoding, or one
/// pattern per 3-level segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterLevels {
    Free(SegmentPattern),
    ThreeLevel([SegmentPattern; 3]),
}

/// Pattern for one address segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentPattern {
    Exact(u16),
    Wildcard,
    Range(u16, u16),
}

impl SegmentPattern {
    fn matches(&self, value: u16) -> bool {
        match self {
            Self::Exact(expected) => value == *expected,
            Self::Wildcard => true,
            Self::Range(low, high) => (*low..=*high).contains(&value),
        }
    }

    fn parse(segment: &str, max: u16, invalid: &impl Fn() -> AddressError) -> Result<Self, AddressError> {
        let segment = segment.trim();
        if segment == "*" {
            return Ok(Self::Wildcard);
        }
        if let Some((low, high)) = segment.split_once('-') {
            let low = if low.is_empty() {
                0
            } else {
                low.parse().map_err(|_| invalid())?
            };
            let high = if high.is_empty() {
                max
            } else {
                high.parse().map_err(|_| invalid())?
            };
            if low > high || high > max {
                return Err(invalid());
            }
            return Ok(Self::Range(low, high));
        }
        let exact: u16 = segment.parse().map_err(|_| invalid())?;
        if exact > max {
            return Err(invalid());
        }
        Ok(Self::Exact(exact))
    }
}

impl AddressFilter {
    /// Returns `true` if the filter matches the given group address.
    #[must_use]
    pub fn matches(&self, address: GroupAddress) -> bool {
        match &self.levels {
            FilterLevels::Free(pattern) => pattern.matches(address.raw()),
            FilterLevels::ThreeLevel([main, middle, sub]) => {
                main.matches(address.main())
                    && middle.matches(address.middle())
                    && sub.matches(address.sub())
            }
        }
    }

    /// Returns the source pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for AddressFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for AddressFilter {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError::InvalidFilter(s.to_string());

        let parts: Vec<&str> = s.split('/').collect();
        let levels = match parts.as_slice() {
            [free] => FilterLevels::Free(SegmentPattern::parse(free, u16::MAX, &invalid)?),
            [main, middle, sub] => FilterLevels::ThreeLevel([
                SegmentPattern::parse(main, GroupAddress::MAIN_MAX, &invalid)?,
                SegmentPattern::parse(middle, GroupAddress::MIDDLE_MAX, &invalid)?,
                SegmentPattern::parse(sub, GroupAddress::SUB_MAX, &invalid)?,
            ]),
            _ => return Err(invalid()),
        };
        Ok(Self {
            pattern: s.to_string(),
            levels,
        })
    }
}
