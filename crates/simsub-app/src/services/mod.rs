//! Collaborator interfaces the coordinator reads from and writes to
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────┐
//! │ handler::    │─────▶│    Services      │
//! │   update()   │      │ (trait objects)  │
//! └──────────────┘      └────────┬─────────┘
//!                                │
//!        ┌──────────────┬────────┼────────────┬──────────────┐
//!        ▼              ▼        ▼            ▼              ▼
//!   subscription    settings   card        radio        user prefs
//!      table         store   enumerator    status        updater
//! ```
//!
//! All lookups are synchronous and may be called from the single message
//! consumer without suspending it.
//!
//! ## Key Components
//!
//! - [`Services`]: bundle of shared collaborator handles held by `AppState`
//! - [`memory`]: in-memory implementations for the daemon binary and tests

pub mod memory;

use std::sync::Arc;

use simsub_core::{AppType, NetworkMode, RadioState, SlotId, SubId, SubState};

/// Persisted subscription records
pub trait SubscriptionTable: Send + Sync {
    /// Subscription id mapped to the slot, if any
    fn sub_id(&self, slot: SlotId) -> Option<SubId>;

    fn sub_state(&self, sub_id: SubId) -> Option<SubState>;

    fn set_sub_state(&self, sub_id: SubId, state: SubState);

    /// Network mode stored against the subscription
    fn network_mode(&self, sub_id: SubId) -> Option<NetworkMode>;

    fn set_network_mode(&self, sub_id: SubId, mode: NetworkMode);
}

/// Device-wide preferred network mode, indexed by slot
pub trait SettingsStore: Send + Sync {
    /// `None` when no value has been persisted for the slot
    fn network_mode(&self, slot: SlotId) -> Option<NetworkMode>;

    fn set_network_mode(&self, slot: SlotId, mode: NetworkMode);
}

/// Enumerates applications on the card in a slot
pub trait CardEnumerator: Send + Sync {
    /// `None` while the card is not yet readable
    fn applications(&self, slot: SlotId) -> Option<Vec<AppType>>;
}

/// Airplane mode and per-slot radio power
pub trait RadioStatus: Send + Sync {
    fn airplane_mode_on(&self) -> bool;

    fn radio_state(&self, slot: SlotId) -> RadioState;
}

/// Recomputes the user preferred voice/data/sms subscriptions
#[cfg_attr(test, mockall::automock)]
pub trait UserPrefsUpdater: Send + Sync {
    /// Called once every slot has been resolved.
    ///
    /// `trigger_dds` asks for a default-data-subscription switch as well.
    fn update_user_prefs(&self, trigger_dds: bool);
}

/// Shared handles to every collaborator
#[derive(Clone)]
pub struct Services {
    pub subscriptions: Arc<dyn SubscriptionTable>,
    pub settings: Arc<dyn SettingsStore>,
    pub cards: Arc<dyn CardEnumerator>,
    pub radio: Arc<dyn RadioStatus>,
    pub user_prefs: Arc<dyn UserPrefsUpdater>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Valid subscription id for the slot, if one is mapped
    pub fn valid_sub_id(&self, slot: SlotId) -> Option<SubId> {
        self.subscriptions
            .sub_id(slot)
            .filter(|id| simsub_core::is_valid_sub_id(*id))
    }
}
