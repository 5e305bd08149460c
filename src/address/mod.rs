// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! KNX bus addressing.
//!
//! Group addresses identify bus destinations shared by zero or more
//! listening devices; individual addresses identify physical senders.
//! Address filters match sets of group addresses by per-level patterns.

mod filter;
mod group_address;
mod individual_address;

pub use filter::AddressFilter;
pub use group_address::GroupAddress;
pub use individual_address::IndividualAddress;
