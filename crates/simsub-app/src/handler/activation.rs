//! Subscription activation handlers
//!
//! An activation round starts with `UpdateSubActivation`, issues at most one
//! set-uicc command per application family for each slot that needs one,
//! and completes once every slot has left `Uninitialized` with no command
//! still outstanding. Completing a round updates user preferences exactly
//! once.

use simsub_core::prelude::*;
use simsub_core::{AppFamily, Outcome, SimPresence, SlotId, SlotStatus, SubState};

use crate::message::Message;
use crate::state::AppState;
use crate::transaction::Progress;

use super::{UpdateAction, UpdateResult};

/// Handle a top-level activation request
pub(crate) fn handle_update_sub_activation(
    state: &mut AppState,
    sim_status: Vec<SimPresence>,
    stack_ready: bool,
) -> UpdateResult {
    if sim_status.len() != state.slot_count() {
        warn!(
            "Ignoring activation request with {} SIM statuses for {} slots",
            sim_status.len(),
            state.slot_count()
        );
        return UpdateResult::none();
    }

    // With a primary card, default-data switching belongs to a higher layer
    state.open_round(stack_ready && !state.policy.primary_card);

    let mut result = UpdateResult::none();
    let mut set_uicc_sent = false;

    for (slot, presence) in sim_status.into_iter().enumerate() {
        if presence == SimPresence::NotInserted {
            debug!("Sim not inserted in slot [{}]", slot);
            state.set_status(slot, SlotStatus::SimNotInserted);
            continue;
        }

        let Some(sub_id) = state.services.valid_sub_id(slot) else {
            warn!("slot {}: no subscription mapped, skipping activation", slot);
            continue;
        };
        let Some(desired) = state.services.subscriptions.sub_state(sub_id) else {
            warn!("slot {}: subscription {} has no record, skipping", slot, sub_id);
            continue;
        };

        let cached = state.slots.status(slot).unwrap_or_default();
        debug!(
            "setUicc for [{}] = {} sub_id = {} prev status = {} stack_ready {}",
            slot, desired, sub_id, cached, stack_ready
        );

        // Do not resend if the slot already reflects the persisted state
        if !cached.matches(desired) || stack_ready {
            result
                .actions
                .extend(set_uicc_subscription(state, slot, desired));
            set_uicc_sent = true;
        }
    }

    // Otherwise the round completes from the last command completion
    if !set_uicc_sent {
        finish_round(state, &mut result);
    }

    result
}

/// Build the set-uicc commands for one slot.
///
/// Returns no commands while the card is unreadable. The slot's transaction
/// is charged for every command before it is handed to the event loop.
pub(crate) fn set_uicc_subscription(
    state: &mut AppState,
    slot: SlotId,
    desired: SubState,
) -> Vec<UpdateAction> {
    let Some(apps) = state.services.cards.applications(slot) else {
        debug!("set_uicc_subscription: slot {} card info not available", slot);
        return Vec::new();
    };
    let Some(slot_state) = state.slots.get_mut(slot) else {
        return Vec::new();
    };

    let mut actions = Vec::new();
    let mut three_gpp_done = false;
    let mut three_gpp2_done = false;

    for (app_index, app) in apps.iter().enumerate() {
        let Some(family) = app.family() else {
            continue;
        };
        let done = match family {
            AppFamily::ThreeGpp => &mut three_gpp_done,
            AppFamily::ThreeGpp2 => &mut three_gpp2_done,
        };
        if *done {
            continue;
        }
        *done = true;

        slot_state.transaction.begin_request();
        actions.push(UpdateAction::SetUiccSubscription {
            slot,
            app_index,
            family,
            desired,
        });

        if three_gpp_done && three_gpp2_done {
            break;
        }
    }

    if actions.is_empty() {
        warn!("slot {}: card exposes no 3GPP or 3GPP2 application", slot);
    }
    actions
}

/// Handle one family's set-uicc completion
pub(crate) fn handle_set_uicc_done(
    state: &mut AppState,
    slot: SlotId,
    family: AppFamily,
    desired: SubState,
    succeeded: bool,
) -> UpdateResult {
    let Some(slot_state) = state.slots.get_mut(slot) else {
        warn!("set-uicc completion for unknown slot {}", slot);
        return UpdateResult::none();
    };

    let results = match slot_state.transaction.record(family, succeeded) {
        Progress::Stray => {
            warn!(
                "slot {}: {} completion with no request outstanding, ignoring",
                slot, family
            );
            return UpdateResult::none();
        }
        Progress::Waiting { outstanding } => {
            info!(
                "Waiting for more responses, slot {} outstanding {}",
                slot, outstanding
            );
            return UpdateResult::none();
        }
        Progress::Resolved(results) => results,
    };

    debug!("slot {}: set-uicc results {:?}", slot, results);

    let sub_id = state.services.valid_sub_id(slot);
    let outcome = results.verdict(desired);
    let mut result = UpdateResult::none();

    match outcome {
        Outcome::Failure => {
            error!(
                "SET_UICC_SUBSCRIPTION failed, slot = {} desired = {}",
                slot, desired
            );
            state.set_status(slot, SlotStatus::SetFailed);
        }
        Outcome::Success => {
            if let Some(sub_id) = sub_id {
                let subscriptions = &state.services.subscriptions;
                if subscriptions.sub_state(sub_id) != Some(desired) {
                    subscriptions.set_sub_state(sub_id, desired);
                }
            }
            state.set_status(slot, SlotStatus::from(desired));
        }
    }

    result.actions.push(UpdateAction::BroadcastSetUiccResult {
        slot,
        sub_id,
        desired,
        outcome,
    });

    finish_round(state, &mut result);
    result
}

/// Complete the open round once every slot is resolved and idle.
///
/// Runs after immediate resolution and after every verdict, success or
/// failure, so a round whose last verdict is a failure still completes.
pub(crate) fn finish_round(state: &mut AppState, result: &mut UpdateResult) {
    if !state.all_subs_available() || state.slots.any_pending() {
        return;
    }
    let Some(round) = state.take_round() else {
        return;
    };

    info!(
        "Received all subs, update user preferred subs, trigger_dds = {}",
        round.trigger_dds
    );
    result.actions.push(UpdateAction::UpdateUserPrefs {
        trigger_dds: round.trigger_dds,
    });

    if state.sync_nw_mode_on_ready {
        result.message = Some(Message::UpdateNetworkMode);
    }
}
