// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge: lifecycle, traffic pump and admin operations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::address::{GroupAddress, IndividualAddress};
use crate::device::{DeviceConfig, DeviceHandle, DeviceRegistry, DeviceUpdate};
use crate::dpt::{TranscoderRef, TranscoderRegistry};
use crate::error::{ConfigStoreError, Error, Result};
use crate::store::{ConfigStore, ConfigStoreEntry};
use crate::telegram::{
    HistoryRecord, Telegram, TelegramEvent, TelegramHistory, TelegramPayload, TelegramTranslator,
};

use super::bus_link::BusLink;
use super::exposure::Exposure;

/// Broadcast capacity for telegram events and device updates. Slow
/// subscribers that fall further behind lose the oldest messages.
const CHANNEL_CAPACITY: usize = 256;

/// Default bound of the telegram history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Static configuration of a [`KnxBridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The bridge's own bus address, used as source of outgoing
    /// telegrams.
    pub individual_address: IndividualAddress,
    /// Path of the persisted entity store document.
    pub store_path: PathBuf,
    /// Path of the telegram history snapshot.
    pub history_path: PathBuf,
    /// Bound of the telegram history buffer.
    pub history_capacity: usize,
}

impl BridgeConfig {
    /// Creates a configuration with default address and history bound.
    #[must_use]
    pub fn new(store_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            individual_address: IndividualAddress::default(),
            store_path: store_path.into(),
            history_path: history_path.into(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Sets the bridge's own bus address.
    #[must_use]
    pub fn with_individual_address(mut self, address: IndividualAddress) -> Self {
        self.individual_address = address;
        self
    }

    /// Sets the telegram history bound.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

struct BridgeInner {
    own_address: IndividualAddress,
    transcoders: TranscoderRegistry,
    translator: parking_lot::RwLock<TelegramTranslator>,
    devices: RwLock<DeviceRegistry>,
    history: RwLock<TelegramHistory>,
    store: RwLock<ConfigStore>,
    exposures: RwLock<HashMap<GroupAddress, Exposure>>,
    events: broadcast::Sender<TelegramEvent>,
    updates: broadcast::Sender<DeviceUpdate>,
    connected: watch::Sender<bool>,
    outgoing: RwLock<Option<mpsc::Sender<Telegram>>>,
}

impl BridgeInner {
    /// Translates a telegram, appends it to the history and notifies
    /// subscribers.
    async fn record(&self, telegram: &Telegram) {
        let event = self.translator.read().translate(telegram);
        self.history.write().await.append(event.clone());
        let _ = self.events.send(event);
    }

    /// Puts a telegram on the bus and records it.
    async fn transmit(&self, telegram: Telegram) -> Result<()> {
        if !*self.connected.borrow() {
            return Err(Error::NotConnected);
        }
        let sender = self
            .outgoing
            .read()
            .await
            .clone()
            .ok_or(Error::NotConnected)?;
        sender
            .send(telegram.clone())
            .await
            .map_err(|error| Error::ChannelClosed(error.to_string()))?;
        self.record(&telegram).await;
        Ok(())
    }
}

/// The bridge core.
///
/// A bridge is created from its [`BridgeConfig`], attached to a bus
/// transport with [`start`](Self::start), and torn down with
/// [`stop`](Self::stop). While running it pumps incoming telegrams
/// through translation, history, subscribers and the device registry,
/// and exposes the admin operations of the service surface.
///
/// All operations other than the lifecycle pair take `&self`; the
/// bridge is `Send + Sync` and can be shared behind an `Arc` once
/// started.
pub struct KnxBridge {
    inner: Arc<BridgeInner>,
    pump: Option<JoinHandle<()>>,
    started: bool,
}

impl KnxBridge {
    /// Creates a stopped bridge.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (connected, _) = watch::channel(false);
        Self {
            inner: Arc::new(BridgeInner {
                own_address: config.individual_address,
                transcoders: TranscoderRegistry::with_defaults(),
                translator: parking_lot::RwLock::new(TelegramTranslator::new()),
                devices: RwLock::new(DeviceRegistry::new(config.individual_address)),
                history: RwLock::new(TelegramHistory::new(
                    config.history_path,
                    config.history_capacity,
                )),
                store: RwLock::new(ConfigStore::new(config.store_path)),
                exposures: RwLock::new(HashMap::new()),
                events,
                updates,
                connected,
                outgoing: RwLock::new(None),
            }),
            pump: None,
            started: false,
        }
    }

    // ===== Lifecycle =====

    /// Starts the bridge on the given bus link.
    ///
    /// Loads the entity store and history snapshot, rebuilds the device
    /// registry from stored entities, spawns the traffic pump, marks
    /// the bus connected and issues the startup state reads. Starting a
    /// running bridge is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when the entity store exists but cannot be read; a missing
    /// or corrupt history snapshot only logs.
    pub async fn start(&mut self, link: BusLink) -> Result<()> {
        if self.started {
            warn!("start called on a running bridge");
            return Ok(());
        }
        self.inner.store.write().await.load().await?;
        self.inner.history.write().await.load().await;

        {
            let store = self.inner.store.read().await;
            let mut devices = self.inner.devices.write().await;
            for entry in store.list() {
                match entry.device_config() {
                    Ok(config) => {
                        if let Err(error) =
                            devices.bind(entry.entity_id.clone(), config, &self.inner.transcoders)
                        {
                            warn!(entity = %entry.entity_id, %error, "skipping stored entity");
                        }
                    }
                    Err(error) => {
                        warn!(entity = %entry.entity_id, %error, "skipping invalid stored entity");
                    }
                }
            }
        }

        *self.inner.outgoing.write().await = Some(link.outgoing);
        // send_replace stores the value even with no live receivers
        self.inner.connected.send_replace(true);
        self.pump = Some(tokio::spawn(pump(self.inner.clone(), link.incoming)));
        self.started = true;

        let requests = self.inner.devices.read().await.sync_requests();
        for request in requests {
            if let Err(error) = self.inner.transmit(request).await {
                warn!(%error, "startup state read failed");
            }
        }
        info!(own_address = %self.inner.own_address, "bridge started");
        Ok(())
    }

    /// Stops the bridge.
    ///
    /// Tears down in order: stop the pump, unbind all devices, save the
    /// history snapshot, release the bus link. Stopping a stopped
    /// bridge is a no-op.
    pub async fn stop(&mut self) {
        if !self.started {
            return;
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.inner.devices.write().await.unbind_all();
        if let Err(error) = self.inner.history.read().await.save().await {
            warn!(%error, "failed to save telegram history");
        }
        *self.inner.outgoing.write().await = None;
        self.inner.connected.send_replace(false);
        self.started = false;
        info!("bridge stopped");
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started { Ok(()) } else { Err(Error::NotLoaded) }
    }

    /// Registers an additional value transcoder, replacing any built-in
    /// codec of the same name.
    pub fn register_transcoder(&self, codec: TranscoderRef) {
        self.inner.transcoders.register(codec);
    }

    /// Returns the bridge's own bus address.
    #[must_use]
    pub fn own_address(&self) -> IndividualAddress {
        self.inner.own_address
    }

    /// Returns `true` while the bridge is started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    // ===== Subscriptions =====

    /// Subscribes to the translated telegram feed.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<TelegramEvent> {
        self.inner.events.subscribe()
    }

    /// Subscribes to device state updates.
    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<DeviceUpdate> {
        self.inner.updates.subscribe()
    }

    /// Returns a watch over the bus connection state.
    #[must_use]
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }

    /// Records a transport-reported connection state change.
    ///
    /// While disconnected every bus write fails with a not-connected
    /// error; reads of local state keep working.
    pub fn connection_state_changed(&self, connected: bool) {
        info!(connected, "bus connection state changed");
        self.inner.connected.send_replace(connected);
    }

    // ===== Bus operations =====

    /// Sends a value to a group address.
    ///
    /// With a `value_type` the payload is encoded through the named
    /// transcoder. Without one the payload is taken raw: an integer
    /// becomes an APCI-embedded bit value, a byte array an explicit
    /// payload. `response` selects a response telegram instead of a
    /// write.
    ///
    /// # Errors
    ///
    /// Fails on unknown value types, unencodable payloads, and while
    /// stopped or disconnected.
    pub async fn send(
        &self,
        destination: GroupAddress,
        payload: &Value,
        value_type: Option<&str>,
        response: bool,
    ) -> Result<()> {
        self.ensure_started()?;
        let raw = self
            .inner
            .transcoders
            .parse(value_type.unwrap_or("raw"))?
            .encode(payload)?;
        let telegram = if response {
            Telegram::response(self.inner.own_address, destination, raw)
        } else {
            Telegram::write(self.inner.own_address, destination, raw)
        };
        self.inner.transmit(telegram).await
    }

    /// Sends a read request for a group address.
    ///
    /// # Errors
    ///
    /// Fails while stopped or disconnected.
    pub async fn read(&self, destination: GroupAddress) -> Result<()> {
        self.ensure_started()?;
        self.inner
            .transmit(Telegram::read(self.inner.own_address, destination))
            .await
    }

    /// Applies a user command to a device and sends the resulting
    /// telegrams.
    ///
    /// # Errors
    ///
    /// Fails for unknown devices, read-only platforms, unencodable
    /// values, and while stopped or disconnected.
    pub async fn send_command(&self, handle: &DeviceHandle, value: &Value) -> Result<()> {
        self.ensure_started()?;
        if !*self.inner.connected.borrow() {
            return Err(Error::NotConnected);
        }
        let (update, telegrams) = self
            .inner
            .devices
            .write()
            .await
            .apply_command(handle, value)?;
        for telegram in telegrams {
            self.inner.transmit(telegram).await?;
        }
        let _ = self.inner.updates.send(update);
        Ok(())
    }

    // ===== Event filters =====

    /// Registers a transcoder for addresses matching `pattern`.
    ///
    /// A plain address pattern becomes an exact binding, which always
    /// wins over filters; anything else is appended to the filter list,
    /// where earlier registrations win.
    ///
    /// # Errors
    ///
    /// Fails on invalid patterns and unknown value types.
    pub fn register_event_filter(&self, pattern: &str, value_type: &str) -> Result<()> {
        self.ensure_started()?;
        let transcoder = self.inner.transcoders.parse(value_type)?;
        let mut translator = self.inner.translator.write();
        if let Ok(address) = pattern.parse::<GroupAddress>() {
            translator.bind_address(address, transcoder);
        } else {
            translator.bind_filter(pattern.parse()?, transcoder);
        }
        debug!(pattern, value_type, "registered event filter");
        Ok(())
    }

    /// Removes the bindings registered for `pattern`, returning whether
    /// any existed.
    ///
    /// # Errors
    ///
    /// Fails on invalid patterns and while stopped.
    pub fn remove_event_filter(&self, pattern: &str) -> Result<bool> {
        self.ensure_started()?;
        let mut translator = self.inner.translator.write();
        if let Ok(address) = pattern.parse::<GroupAddress>() {
            Ok(translator.remove_address(address))
        } else {
            Ok(translator.remove_filter(&pattern.parse()?))
        }
    }

    // ===== Exposures =====

    /// Registers an exposure on a group address, replacing (with a
    /// warning) any previous exposure there.
    ///
    /// # Errors
    ///
    /// Fails on unknown value types and while stopped.
    pub async fn register_exposure(
        &self,
        address: GroupAddress,
        value_type: &str,
        respond_to_read: bool,
    ) -> Result<()> {
        self.ensure_started()?;
        let transcoder = self.inner.transcoders.parse(value_type)?;
        let mut exposures = self.inner.exposures.write().await;
        if let Some(previous) = exposures.insert(
            address,
            Exposure::new(address, transcoder, respond_to_read),
        ) {
            warn!(
                %address,
                previous = previous.value_type(),
                "replaced existing exposure",
            );
        }
        Ok(())
    }

    /// Removes the exposure on `address`, returning whether one
    /// existed.
    ///
    /// # Errors
    ///
    /// Fails while stopped.
    pub async fn remove_exposure(&self, address: GroupAddress) -> Result<bool> {
        self.ensure_started()?;
        Ok(self.inner.exposures.write().await.remove(&address).is_some())
    }

    /// Publishes a host value through the exposure on `address`.
    ///
    /// # Errors
    ///
    /// Fails for unregistered addresses, unencodable values, and while
    /// stopped or disconnected.
    pub async fn publish_exposure(&self, address: GroupAddress, value: &Value) -> Result<()> {
        self.ensure_started()?;
        let telegram = {
            let mut exposures = self.inner.exposures.write().await;
            let exposure = exposures
                .get_mut(&address)
                .ok_or_else(|| Error::DeviceNotFound(address.to_string()))?;
            exposure.publish(value, self.inner.own_address)?
        };
        self.inner.transmit(telegram).await
    }

    // ===== Entity store =====

    /// Creates a stored entity and binds the corresponding device.
    ///
    /// # Errors
    ///
    /// Fails on invalid payloads, unregistered value types and
    /// persistence errors; neither the store nor the registry is
    /// touched in that case.
    pub async fn create_entity(&self, platform: &str, data: Value) -> Result<ConfigStoreEntry> {
        self.ensure_started()?;
        // binding must be able to succeed before the store is mutated
        let config = DeviceConfig::from_value(platform, &data).map_err(ConfigStoreError::Validation)?;
        self.inner.transcoders.parse(config.kind.transcoder_name())?;
        let entry = self.inner.store.write().await.create(platform, data).await?;
        self.inner
            .devices
            .write()
            .await
            .bind(entry.entity_id.clone(), config, &self.inner.transcoders)?;
        Ok(entry)
    }

    /// Replaces a stored entity's configuration and rebinds its device.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids, invalid payloads and persistence errors;
    /// the previous binding stays in place then.
    pub async fn update_entity(
        &self,
        handle: &DeviceHandle,
        data: Value,
    ) -> Result<ConfigStoreEntry> {
        self.ensure_started()?;
        let config = {
            let store = self.inner.store.read().await;
            let existing = store
                .get(handle)
                .ok_or_else(|| ConfigStoreError::UnknownEntity(handle.to_string()))?;
            let config = DeviceConfig::from_value(&existing.platform, &data)
                .map_err(ConfigStoreError::Validation)?;
            self.inner.transcoders.parse(config.kind.transcoder_name())?;
            config
        };
        let entry = self.inner.store.write().await.update(handle, data).await?;
        self.inner
            .devices
            .write()
            .await
            .bind(handle.clone(), config, &self.inner.transcoders)?;
        Ok(entry)
    }

    /// Deletes a stored entity and unbinds its device.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and persistence errors.
    pub async fn delete_entity(&self, handle: &DeviceHandle) -> Result<()> {
        self.ensure_started()?;
        self.inner.store.write().await.delete(handle).await?;
        self.inner.devices.write().await.unbind(handle);
        Ok(())
    }

    /// Returns a stored entity's configuration.
    ///
    /// # Errors
    ///
    /// Fails for unknown ids and while stopped.
    pub async fn get_entity(&self, handle: &DeviceHandle) -> Result<ConfigStoreEntry> {
        self.ensure_started()?;
        self.inner
            .store
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| {
                crate::error::ConfigStoreError::UnknownEntity(handle.to_string()).into()
            })
    }

    /// Returns all stored entities in id order.
    ///
    /// # Errors
    ///
    /// Fails while stopped.
    pub async fn list_entities(&self) -> Result<Vec<ConfigStoreEntry>> {
        self.ensure_started()?;
        Ok(self
            .inner
            .store
            .read()
            .await
            .list()
            .into_iter()
            .cloned()
            .collect())
    }

    // ===== State access =====

    /// Returns up to `count` history records, most recent first.
    ///
    /// # Errors
    ///
    /// Fails while stopped.
    pub async fn recent_telegrams(&self, count: usize) -> Result<Vec<HistoryRecord>> {
        self.ensure_started()?;
        Ok(self.inner.history.read().await.recent(count))
    }

    /// Returns a state snapshot of every bound device.
    pub async fn device_states(&self) -> Vec<DeviceUpdate> {
        self.inner.devices.read().await.updates()
    }

    /// Seeds persisted states into devices that cannot read theirs from
    /// the bus, publishing an update for each device that took a seed.
    ///
    /// # Errors
    ///
    /// Fails while stopped.
    pub async fn seed_device_states(&self, states: HashMap<DeviceHandle, Value>) -> Result<()> {
        self.ensure_started()?;
        let updates = self.inner.devices.write().await.seed_states(&states);
        for update in updates {
            let _ = self.inner.updates.send(update);
        }
        Ok(())
    }
}

/// The traffic pump: drains the bus link until it closes.
async fn pump(inner: Arc<BridgeInner>, mut incoming: mpsc::Receiver<Telegram>) {
    while let Some(telegram) = incoming.recv().await {
        inner.record(&telegram).await;

        let (updates, mut responses) = inner.devices.write().await.handle_telegram(&telegram);
        if matches!(telegram.payload, TelegramPayload::GroupValueRead) {
            if let Some(answer) = inner
                .exposures
                .read()
                .await
                .get(&telegram.destination)
                .and_then(|exposure| exposure.answer_read(inner.own_address))
            {
                responses.push(answer);
            }
        }
        for update in updates {
            let _ = inner.updates.send(update);
        }
        for response in responses {
            if let Err(error) = inner.transmit(response).await {
                warn!(%error, "failed to send response telegram");
            }
        }
    }
    debug!("bus link closed, pump ending");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::telegram::{Direction, TelegramValue};

    use super::*;

    fn config(dir: &tempfile::TempDir) -> BridgeConfig {
        BridgeConfig::new(dir.path().join("store.json"), dir.path().join("history.json"))
            .with_individual_address("1.0.250".parse().unwrap())
            .with_history_capacity(16)
    }

    fn incoming_write(destination: &str, value: TelegramValue) -> Telegram {
        Telegram::new(
            "1.1.4".parse().unwrap(),
            destination.parse().unwrap(),
            TelegramPayload::GroupValueWrite(value),
            Direction::Incoming,
        )
    }

    #[tokio::test]
    async fn operations_fail_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = KnxBridge::new(config(&dir));

        let result = bridge.send("1/2/3".parse().unwrap(), &json!(1), None, false).await;
        assert!(matches!(result, Err(Error::NotLoaded)));
        assert!(matches!(
            bridge.recent_telegrams(5).await,
            Err(Error::NotLoaded)
        ));
        assert!(matches!(
            bridge.register_event_filter("1/2/*", "switch"),
            Err(Error::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn incoming_telegram_feeds_history_and_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();
        bridge.register_event_filter("1/2/3", "switch").unwrap();

        let mut events = bridge.subscribe_events();
        peer.incoming
            .send(incoming_write("1/2/3", TelegramValue::Bit(1)))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.value, Some(json!(true)));
        assert_eq!(event.decoder.as_deref(), Some("switch"));

        let records = bridge.recent_telegrams(5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event.destination.to_string(), "1/2/3");

        bridge.stop().await;
    }

    #[tokio::test]
    async fn send_reaches_the_wire_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, mut peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        bridge
            .send("1/2/3".parse().unwrap(), &json!(1), None, false)
            .await
            .unwrap();

        let telegram = peer.outgoing.recv().await.unwrap();
        assert_eq!(
            telegram.payload,
            TelegramPayload::GroupValueWrite(TelegramValue::Bit(1))
        );
        assert_eq!(telegram.source, bridge.own_address());
        assert_eq!(telegram.direction, Direction::Outgoing);

        let records = bridge.recent_telegrams(5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event.direction, Direction::Outgoing);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn typed_send_propagates_conversion_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        let result = bridge
            .send("1/2/3".parse().unwrap(), &json!("hot"), Some("temperature"), false)
            .await;
        assert!(matches!(result, Err(Error::Transcoder(_))));

        let result = bridge
            .send("1/2/3".parse().unwrap(), &json!(1), Some("hyperspace"), false)
            .await;
        assert!(matches!(result, Err(Error::Transcoder(_))));

        bridge.stop().await;
    }

    #[tokio::test]
    async fn disconnected_bus_suppresses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        bridge.connection_state_changed(false);
        let result = bridge.send("1/2/3".parse().unwrap(), &json!(1), None, false).await;
        assert!(matches!(result, Err(Error::NotConnected)));

        bridge.connection_state_changed(true);
        assert!(bridge.send("1/2/3".parse().unwrap(), &json!(1), None, false).await.is_ok());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn connection_state_survives_without_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);

        // no watch receiver is held anywhere while the state changes
        bridge.start(link).await.unwrap();
        assert!(*bridge.connected().borrow());
        assert!(bridge.send("1/2/3".parse().unwrap(), &json!(1), None, false).await.is_ok());

        bridge.stop().await;
        assert!(!*bridge.connected().borrow());
    }

    #[tokio::test]
    async fn rejected_entity_configs_leave_the_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        let result = bridge
            .create_entity(
                "sensor",
                json!({"name": "Outside", "ga_state": "2/0/1", "value_type": "hyperspace"}),
            )
            .await;
        assert!(result.is_err());
        assert!(bridge.list_entities().await.unwrap().is_empty());
        assert!(bridge.device_states().await.is_empty());

        let entry = bridge
            .create_entity(
                "sensor",
                json!({"name": "Outside", "ga_state": "2/0/1", "value_type": "temperature"}),
            )
            .await
            .unwrap();
        let result = bridge
            .update_entity(
                &entry.entity_id,
                json!({"name": "Outside", "ga_state": "2/0/1", "value_type": "hyperspace"}),
            )
            .await;
        assert!(result.is_err());
        let stored = bridge.get_entity(&entry.entity_id).await.unwrap();
        assert_eq!(stored.data["value_type"], json!("temperature"));
        assert_eq!(bridge.device_states().await.len(), 1);

        bridge.stop().await;
    }

    #[tokio::test]
    async fn entity_lifecycle_binds_and_unbinds_devices() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        let entry = bridge
            .create_entity("switch", json!({"name": "Kitchen", "ga_write": "1/2/3"}))
            .await
            .unwrap();
        assert_eq!(bridge.device_states().await.len(), 1);

        bridge
            .update_entity(&entry.entity_id, json!({"name": "Renamed", "ga_write": "1/2/3"}))
            .await
            .unwrap();
        let states = bridge.device_states().await;
        assert_eq!(states[0].name, "Renamed");

        bridge.delete_entity(&entry.entity_id).await.unwrap();
        assert!(bridge.device_states().await.is_empty());
        assert!(bridge.get_entity(&entry.entity_id).await.is_err());

        bridge.stop().await;
    }

    #[tokio::test]
    async fn stored_entities_rebind_on_restart() {
        let dir = tempfile::tempdir().unwrap();

        let entry = {
            let mut bridge = KnxBridge::new(config(&dir));
            let (link, _peer) = BusLink::pair(8);
            bridge.start(link).await.unwrap();
            let entry = bridge
                .create_entity("switch", json!({"name": "Kitchen", "ga_write": "1/2/3"}))
                .await
                .unwrap();
            bridge.stop().await;
            entry
        };

        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();
        let states = bridge.device_states().await;
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].handle, entry.entity_id);
        bridge.stop().await;
    }

    #[tokio::test]
    async fn exposure_answers_read_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, mut peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();

        let address: GroupAddress = "4/0/17".parse().unwrap();
        bridge.register_exposure(address, "temperature", true).await.unwrap();
        bridge.publish_exposure(address, &json!(21.0)).await.unwrap();

        let published = peer.outgoing.recv().await.unwrap();
        assert_eq!(
            published.payload,
            TelegramPayload::GroupValueWrite(TelegramValue::Bytes(vec![0x0C, 0x1A]))
        );

        peer.incoming
            .send(Telegram::new(
                "1.1.4".parse().unwrap(),
                address,
                TelegramPayload::GroupValueRead,
                Direction::Incoming,
            ))
            .await
            .unwrap();

        let answer = peer.outgoing.recv().await.unwrap();
        assert_eq!(
            answer.payload,
            TelegramPayload::GroupValueResponse(TelegramValue::Bytes(vec![0x0C, 0x1A]))
        );

        bridge.stop().await;
    }

    #[tokio::test]
    async fn stop_saves_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();
        bridge.send("1/2/3".parse().unwrap(), &json!(1), None, false).await.unwrap();
        bridge.stop().await;

        let mut bridge = KnxBridge::new(config(&dir));
        let (link, _peer) = BusLink::pair(8);
        bridge.start(link).await.unwrap();
        let records = bridge.recent_telegrams(5).await.unwrap();
        assert_eq!(records.len(), 1);
        bridge.stop().await;
    }
}
