//! In-memory collaborator implementations
//!
//! Back the daemon binary when it runs without a platform store, and give
//! tests direct access to what the coordinator wrote.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use simsub_core::prelude::*;
use simsub_core::{AppType, NetworkMode, RadioState, SlotId, SubId, SubState};

use super::{CardEnumerator, RadioStatus, Services, SettingsStore, SubscriptionTable, UserPrefsUpdater};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One row of the subscription table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub sub_id: SubId,
    pub state: SubState,
    pub network_mode: NetworkMode,
}

impl SubscriptionRecord {
    /// Fresh row: active, network mode still at the factory default
    pub fn new(sub_id: SubId) -> Self {
        Self {
            sub_id,
            state: SubState::Active,
            network_mode: NetworkMode::TABLE_DEFAULT,
        }
    }

    pub fn with_state(mut self, state: SubState) -> Self {
        self.state = state;
        self
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }
}

// ─────────────────────────────────────────────────────────────────
// Subscription Table
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySubscriptionTable {
    slots: RwLock<HashMap<SlotId, SubId>>,
    records: RwLock<HashMap<SubId, SubscriptionRecord>>,
}

impl MemorySubscriptionTable {
    /// Map `slot` to the record's subscription, replacing any previous row
    pub fn insert(&self, slot: SlotId, record: SubscriptionRecord) {
        write(&self.slots).insert(slot, record.sub_id);
        write(&self.records).insert(record.sub_id, record);
    }

    pub fn record(&self, sub_id: SubId) -> Option<SubscriptionRecord> {
        read(&self.records).get(&sub_id).cloned()
    }

    /// Record mapped to `slot`
    pub fn record_for_slot(&self, slot: SlotId) -> Option<SubscriptionRecord> {
        let sub_id = *read(&self.slots).get(&slot)?;
        self.record(sub_id)
    }

    pub fn unmap_slot(&self, slot: SlotId) {
        write(&self.slots).remove(&slot);
    }
}

impl SubscriptionTable for MemorySubscriptionTable {
    fn sub_id(&self, slot: SlotId) -> Option<SubId> {
        read(&self.slots).get(&slot).copied()
    }

    fn sub_state(&self, sub_id: SubId) -> Option<SubState> {
        read(&self.records).get(&sub_id).map(|r| r.state)
    }

    fn set_sub_state(&self, sub_id: SubId, state: SubState) {
        if let Some(record) = write(&self.records).get_mut(&sub_id) {
            record.state = state;
        }
    }

    fn network_mode(&self, sub_id: SubId) -> Option<NetworkMode> {
        read(&self.records).get(&sub_id).map(|r| r.network_mode)
    }

    fn set_network_mode(&self, sub_id: SubId, mode: NetworkMode) {
        if let Some(record) = write(&self.records).get_mut(&sub_id) {
            record.network_mode = mode;
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Settings Store
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    modes: RwLock<HashMap<SlotId, NetworkMode>>,
}

impl MemorySettingsStore {
    pub fn remove(&self, slot: SlotId) {
        write(&self.modes).remove(&slot);
    }
}

impl SettingsStore for MemorySettingsStore {
    fn network_mode(&self, slot: SlotId) -> Option<NetworkMode> {
        read(&self.modes).get(&slot).copied()
    }

    fn set_network_mode(&self, slot: SlotId, mode: NetworkMode) {
        write(&self.modes).insert(slot, mode);
    }
}

// ─────────────────────────────────────────────────────────────────
// Cards and Radio
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryCardEnumerator {
    cards: RwLock<HashMap<SlotId, Vec<AppType>>>,
}

impl MemoryCardEnumerator {
    pub fn insert_card(&self, slot: SlotId, apps: Vec<AppType>) {
        write(&self.cards).insert(slot, apps);
    }

    /// Make the card in `slot` unreadable
    pub fn remove_card(&self, slot: SlotId) {
        write(&self.cards).remove(&slot);
    }
}

impl CardEnumerator for MemoryCardEnumerator {
    fn applications(&self, slot: SlotId) -> Option<Vec<AppType>> {
        read(&self.cards).get(&slot).cloned()
    }
}

#[derive(Debug, Default)]
pub struct MemoryRadioStatus {
    airplane_mode: AtomicBool,
    radio: RwLock<HashMap<SlotId, RadioState>>,
}

impl MemoryRadioStatus {
    pub fn set_airplane_mode(&self, on: bool) {
        self.airplane_mode.store(on, Ordering::SeqCst);
    }

    pub fn set_radio_state(&self, slot: SlotId, state: RadioState) {
        write(&self.radio).insert(slot, state);
    }
}

impl RadioStatus for MemoryRadioStatus {
    fn airplane_mode_on(&self) -> bool {
        self.airplane_mode.load(Ordering::SeqCst)
    }

    fn radio_state(&self, slot: SlotId) -> RadioState {
        read(&self.radio).get(&slot).copied().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────
// User Preferences
// ─────────────────────────────────────────────────────────────────

/// Records every user-preference update it is asked for
#[derive(Debug, Default)]
pub struct RecordingUserPrefs {
    calls: Mutex<Vec<bool>>,
}

impl RecordingUserPrefs {
    /// `trigger_dds` of every call, oldest first
    pub fn calls(&self) -> Vec<bool> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl UserPrefsUpdater for RecordingUserPrefs {
    fn update_user_prefs(&self, trigger_dds: bool) {
        info!("Updating user preferred subscriptions, trigger_dds={}", trigger_dds);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(trigger_dds);
    }
}

// ─────────────────────────────────────────────────────────────────
// Bundle
// ─────────────────────────────────────────────────────────────────

/// Concrete in-memory stores, kept alongside the trait-object view
#[derive(Debug, Clone, Default)]
pub struct MemoryServices {
    pub subscriptions: Arc<MemorySubscriptionTable>,
    pub settings: Arc<MemorySettingsStore>,
    pub cards: Arc<MemoryCardEnumerator>,
    pub radio: Arc<MemoryRadioStatus>,
    pub user_prefs: Arc<RecordingUserPrefs>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device with a USIM + CSIM card in every slot, each mapped to an
    /// active subscription `slot + 1`, with `default_mode` in the settings store
    pub fn provisioned(slots: usize, default_mode: NetworkMode) -> Self {
        let stores = Self::new();
        for slot in 0..slots {
            stores
                .subscriptions
                .insert(slot, SubscriptionRecord::new(slot as SubId + 1));
            stores
                .cards
                .insert_card(slot, vec![AppType::Usim, AppType::Csim]);
            stores.settings.set_network_mode(slot, default_mode);
        }
        stores
    }

    pub fn services(&self) -> Services {
        Services {
            subscriptions: self.subscriptions.clone(),
            settings: self.settings.clone(),
            cards: self.cards.clone(),
            radio: self.radio.clone(),
            user_prefs: self.user_prefs.clone(),
        }
    }
}
