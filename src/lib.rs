// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `KnxR` Lib - A Rust library bridging a KNX group bus into a host
//! application.
//!
//! The bridge attaches to a bus transport through a pair of telegram
//! channels, translates raw group telegrams into typed events, keeps a
//! bounded history, manages configured devices with persisted entity
//! configuration, and exposes an admin command surface.
//!
//! # Supported Features
//!
//! - **Telegram translation**: exact and filter-based transcoder
//!   bindings, with decode failures surfaced as null values
//! - **Devices**: switches, sensors, fans, scenes, buttons, text and
//!   date platforms with persisted configuration
//! - **History**: bounded most-recent-first telegram buffer with
//!   snapshot persistence
//! - **Exposures**: host values published to the bus, optionally
//!   answering read requests
//! - **Service surface**: correlation-id commands with stable error
//!   codes
//!
//! # Quick Start
//!
//! ```no_run
//! use knxr_lib::bridge::{BridgeConfig, BusLink, KnxBridge};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> knxr_lib::Result<()> {
//!     let config = BridgeConfig::new("store.json", "history.json")
//!         .with_individual_address("1.0.250".parse()?);
//!     let mut bridge = KnxBridge::new(config);
//!
//!     // The transport layer owns the other end of the link.
//!     let (link, _transport) = BusLink::pair(64);
//!     bridge.start(link).await?;
//!
//!     bridge.register_event_filter("1/2/*", "switch")?;
//!     let mut events = bridge.subscribe_events();
//!
//!     bridge.send("1/2/3".parse()?, &json!(1), None, false).await?;
//!     let event = events.recv().await.expect("event feed closed");
//!     println!("{event:?}");
//!
//!     bridge.stop().await;
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod bridge;
pub mod device;
pub mod dpt;
pub mod error;
pub mod service;
pub mod store;
pub mod telegram;

pub use address::{AddressFilter, GroupAddress, IndividualAddress};
pub use bridge::{BridgeConfig, BusLink, KnxBridge};
pub use device::{DeviceConfig, DeviceHandle, DeviceKind, DeviceUpdate};
pub use dpt::{Transcoder, TranscoderRegistry};
pub use error::{Error, Result};
pub use service::{ServiceHandler, ServiceRequest, ServiceResponse};
pub use store::{ConfigStore, ConfigStoreEntry};
pub use telegram::{Telegram, TelegramEvent, TelegramHistory, TelegramValue};
