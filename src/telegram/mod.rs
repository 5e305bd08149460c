// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus telegrams and their translation to typed events.
//!
//! The wire layer delivers [`Telegram`] values; the [`TelegramTranslator`]
//! resolves a transcoder for the destination address and produces
//! [`TelegramEvent`] records, which feed subscribers and the bounded
//! [`TelegramHistory`].

mod event;
mod history;
#[allow(clippy::module_inception)]
mod telegram;
mod translator;

pub use event::TelegramEvent;
pub use history::{HistoryRecord, TelegramHistory};
pub(crate) use history::write_atomic;
pub use telegram::{Direction, Telegram, TelegramPayload, TelegramValue};
pub use translator::TelegramTranslator;
