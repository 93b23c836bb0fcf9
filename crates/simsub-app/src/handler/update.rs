//! Main update function - handles state transitions (TEA pattern)

use simsub_core::prelude::*;

use crate::message::Message;
use crate::state::AppState;

use super::{activation, network_mode, refresh, UpdateResult};

/// Process a message and update state
/// Returns an optional follow-up message and the actions to perform
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::UpdateSubActivation {
            sim_status,
            stack_ready,
        } => activation::handle_update_sub_activation(state, sim_status, stack_ready),

        Message::SetUiccDone {
            slot,
            family,
            desired,
            succeeded,
        } => activation::handle_set_uicc_done(state, slot, family, desired, succeeded),

        Message::IccRefresh { slot, kind } => refresh::handle_icc_refresh(state, slot, kind),

        Message::ReconcileOnBoot => network_mode::handle_reconcile_on_boot(state),

        Message::NetworkModeSettingChanged => network_mode::handle_setting_changed(state),

        Message::UpdateNetworkMode => network_mode::handle_update_network_mode(state),

        Message::SetNetworkModeDone { succeeded } => {
            network_mode::handle_set_network_mode_done(state, succeeded)
        }

        Message::NetworkModeQueried { slot, mode } => {
            network_mode::handle_network_mode_queried(state, slot, mode)
        }

        Message::Shutdown => {
            info!("Coordinator shutting down");
            state.request_quit();
            UpdateResult::none()
        }
    }
}
