//! Network mode reconciliation between the settings store, the
//! subscription table and the modem

use simsub_core::prelude::*;
use simsub_core::{NetworkMode, SlotId};

use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Settings value for `slot`, or the compiled-in default on a miss
fn settings_mode(state: &AppState, slot: SlotId) -> NetworkMode {
    match state.services.settings.network_mode(slot) {
        Some(mode) => mode,
        None => {
            error!(
                "No preferred network mode stored for slot {}, using {}",
                slot,
                NetworkMode::PREFERRED
            );
            NetworkMode::PREFERRED
        }
    }
}

/// Copy settings values into the subscription table.
///
/// Without `overwrite` only rows still at the factory default are seeded.
/// Slots without a valid subscription are skipped.
pub(crate) fn reconcile_table(state: &AppState, overwrite: bool) {
    for slot in 0..state.slot_count() {
        let Some(sub_id) = state.services.valid_sub_id(slot) else {
            continue;
        };

        let settings_mode = settings_mode(state, slot);
        let table_mode = state
            .services
            .subscriptions
            .network_mode(sub_id)
            .unwrap_or(NetworkMode::TABLE_DEFAULT);
        debug!(
            "reconcile slot {}: table = {}, settings = {}",
            slot, table_mode, settings_mode
        );

        if overwrite || table_mode.is_table_default() {
            state
                .services
                .subscriptions
                .set_network_mode(sub_id, settings_mode);
        }
    }
}

/// Unconditional reconcile; arms the settings-change observer
pub(crate) fn reconcile_on_demand(state: &mut AppState) {
    reconcile_table(state, true);
    state.nw_mode_reconciled = true;
}

pub(crate) fn handle_reconcile_on_boot(state: &mut AppState) -> UpdateResult {
    reconcile_table(state, false);
    UpdateResult::none()
}

/// The observer ignores changes until the first reconciliation, which
/// would otherwise react to its own writes
pub(crate) fn handle_setting_changed(state: &mut AppState) -> UpdateResult {
    if !state.nw_mode_reconciled {
        trace!("Network mode setting changed before first reconcile, ignoring");
        return UpdateResult::none();
    }
    reconcile_table(state, true);
    UpdateResult::none()
}

/// Push table modes to the modem if any differs from the settings store
pub(crate) fn handle_update_network_mode(state: &mut AppState) -> UpdateResult {
    reconcile_table(state, false);
    state.nw_mode_reconciled = true;

    let mut modes = Vec::with_capacity(state.slot_count());
    let mut update_required = false;

    for slot in 0..state.slot_count() {
        let settings_mode = settings_mode(state, slot);

        let Some(sub_id) = state.services.valid_sub_id(slot) else {
            modes.push(settings_mode);
            continue;
        };
        let table_mode = state
            .services
            .subscriptions
            .network_mode(sub_id)
            .unwrap_or(NetworkMode::TABLE_DEFAULT);

        // A slot still at the factory default holds back every slot
        if table_mode.is_table_default() {
            debug!("update_network_mode: slot {} not reconciled yet", slot);
            return UpdateResult::none();
        }

        if table_mode.is_valid() {
            update_required |= table_mode != settings_mode;
            modes.push(table_mode);
        } else {
            warn!("slot {}: table network mode {} out of range", slot, table_mode);
            modes.push(settings_mode);
        }
    }

    info!("update_network_mode: update required in modem: {}", update_required);
    if !update_required {
        return UpdateResult::none();
    }

    for (slot, mode) in modes.iter().enumerate() {
        debug!("Updating settings for slot [{}] with {}", slot, mode);
        state.services.settings.set_network_mode(slot, *mode);
    }

    UpdateResult::action(UpdateAction::SetPreferredNetworkModes { modes })
}

/// After a rejected push the modem is the source of truth
pub(crate) fn handle_set_network_mode_done(state: &mut AppState, succeeded: bool) -> UpdateResult {
    if succeeded {
        debug!("Preferred network modes set as per subscription table");
        return UpdateResult::none();
    }

    warn!("Failed to set preferred network modes, reading back from modem");
    UpdateResult::actions(
        (0..state.slot_count())
            .map(|slot| UpdateAction::QueryNetworkMode { slot })
            .collect(),
    )
}

pub(crate) fn handle_network_mode_queried(
    state: &mut AppState,
    slot: SlotId,
    mode: Option<NetworkMode>,
) -> UpdateResult {
    if slot >= state.slot_count() {
        warn!("Network mode query result for unknown slot {}", slot);
        return UpdateResult::none();
    }

    match mode {
        None => error!("Network mode query failed for slot {}", slot),
        Some(mode) if mode.is_valid() => {
            debug!("Updating settings for slot [{}] with modem mode {}", slot, mode);
            state.services.settings.set_network_mode(slot, mode);
        }
        Some(mode) => warn!("Invalid network mode {} reported for slot {}", mode, slot),
    }

    UpdateResult::none()
}
