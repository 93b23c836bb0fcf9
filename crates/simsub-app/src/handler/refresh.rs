//! SIM refresh handling and ICC event gating

use simsub_core::prelude::*;
use simsub_core::{RefreshKind, SlotId, SlotStatus};

use crate::state::AppState;

use super::UpdateResult;

/// A card reset forces the slot to be activated again; other refresh kinds
/// leave the slot alone.
pub(crate) fn handle_icc_refresh(state: &mut AppState, slot: SlotId, kind: RefreshKind) -> UpdateResult {
    let Some(old) = state.slots.status(slot) else {
        warn!("SIM refresh for unknown slot {}", slot);
        return UpdateResult::none();
    };

    info!(
        "Received SIM refresh, slot {} old status {} refresh = {:?}",
        slot, old, kind
    );

    if kind == RefreshKind::Reset {
        state.set_status(slot, SlotStatus::Uninitialized);
    }

    UpdateResult::none()
}

/// Whether a SIM-presence change on `slot` should be acted upon.
///
/// When the SIM powers down with the radio, an airplane-mode or radio-off
/// slot is reset so that activation is sent again once the radio returns.
/// A radio that is unavailable (subsystem restart) also resets the slot.
pub(crate) fn should_process_icc_event(state: &mut AppState, slot: SlotId) -> bool {
    let airplane_mode = state.services.radio.airplane_mode_on();
    let radio = state.services.radio.radio_state(slot);
    let sim_powers_down = !state.policy.apm_sim_not_pwdn;

    if sim_powers_down && (!radio.is_on() || airplane_mode) {
        info!("should_process_icc_event: radio off/unavailable, slot = {}", slot);
        state.set_status(slot, SlotStatus::Uninitialized);
    }

    if airplane_mode && sim_powers_down {
        debug!("should_process_icc_event: SIM powered down in airplane mode");
        return false;
    }

    if !radio.is_available() {
        info!("should_process_icc_event: radio not available, slot = {}", slot);
        state.set_status(slot, SlotStatus::Uninitialized);
        return false;
    }

    true
}
