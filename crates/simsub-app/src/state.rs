//! Coordinator state (the Model)

use simsub_core::prelude::*;
use simsub_core::{SlotId, SlotStatus};

use crate::config::Settings;
use crate::services::Services;
use crate::transaction::SetUiccTransaction;

/// Everything the coordinator tracks for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    pub status: SlotStatus,
    pub transaction: SetUiccTransaction,
}

/// Fixed-size table of slot states, indexed by slot
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<SlotState>,
}

impl SlotTable {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![SlotState::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: SlotId) -> Option<&SlotState> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut SlotState> {
        self.slots.get_mut(slot)
    }

    pub fn status(&self, slot: SlotId) -> Option<SlotStatus> {
        self.slots.get(slot).map(|s| s.status)
    }

    pub fn statuses(&self) -> Vec<SlotStatus> {
        self.slots.iter().map(|s| s.status).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &SlotState)> {
        self.slots.iter().enumerate()
    }

    /// No slot is still `Uninitialized`
    pub fn all_resolved(&self) -> bool {
        self.slots.iter().all(|s| s.status.is_resolved())
    }

    /// Some slot still waits on a modem completion
    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(|s| s.transaction.is_pending())
    }
}

/// Context of one top-level activation request, kept until every slot
/// resolves and user preferences have been updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationRound {
    /// Ask for a default-data-subscription switch when the round completes
    pub trigger_dds: bool,
}

/// Device policy flags read once from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DevicePolicy {
    pub primary_card: bool,
    pub apm_sim_not_pwdn: bool,
}

/// Complete coordinator state
#[derive(Debug)]
pub struct AppState {
    pub slots: SlotTable,
    pub policy: DevicePolicy,
    /// Open activation round, if any
    pub round: Option<ActivationRound>,
    /// Network modes have been reconciled at least once
    pub nw_mode_reconciled: bool,
    pub sync_nw_mode_on_ready: bool,
    pub services: Services,
    quitting: bool,
}

impl AppState {
    pub fn new(settings: &Settings, services: Services) -> Self {
        Self {
            slots: SlotTable::new(settings.device.slots),
            policy: DevicePolicy {
                primary_card: settings.device.primary_card,
                apm_sim_not_pwdn: settings.device.apm_sim_not_pwdn,
            },
            round: None,
            nw_mode_reconciled: false,
            sync_nw_mode_on_ready: settings.network_mode.sync_on_ready,
            services,
            quitting: false,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Change a slot's status; out-of-range slots are ignored
    pub fn set_status(&mut self, slot: SlotId, status: SlotStatus) {
        if let Some(state) = self.slots.get_mut(slot) {
            if state.status != status {
                debug!("slot {}: {} -> {}", slot, state.status, status);
                state.status = status;
            }
        }
    }

    /// Open a round, or fold the trigger into the one already open
    pub fn open_round(&mut self, trigger_dds: bool) {
        let round = self.round.get_or_insert_with(ActivationRound::default);
        round.trigger_dds |= trigger_dds;
    }

    pub fn take_round(&mut self) -> Option<ActivationRound> {
        self.round.take()
    }

    /// Every slot has left `Uninitialized`
    pub fn all_subs_available(&self) -> bool {
        self.slots.all_resolved()
    }

    /// More than one slot exists and this one must be activated again
    pub fn needs_activation_after_refresh(&self, slot: SlotId) -> bool {
        self.slots.len() > 1 && self.slots.status(slot) == Some(SlotStatus::Uninitialized)
    }

    pub fn request_quit(&mut self) {
        self.quitting = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quitting
    }
}
