//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Modem commands run on their own tasks and report back by sending a
//! typed [`Message`] into the coordinator's channel. A failed or timed-out
//! command is reported as an unsuccessful completion so no slot transaction
//! is left waiting.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use simsub_core::prelude::*;
use simsub_core::{AppFamily, NetworkMode, SlotId, SubState};
use simsub_modem::{ModemBinding, ModemBindingPolicy};

use crate::engine_event::EngineEvent;
use crate::handler::UpdateAction;
use crate::message::Message;
use crate::services::UserPrefsUpdater;

/// Handles an action needs beyond the action itself
#[derive(Clone)]
pub struct ActionContext {
    pub msg_tx: mpsc::Sender<Message>,
    pub binding: ModemBinding,
    pub user_prefs: Arc<dyn UserPrefsUpdater>,
    pub event_tx: broadcast::Sender<EngineEvent>,
}

impl ActionContext {
    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

/// Execute an action, spawning a task for anything that talks to the modem
pub fn handle_action(action: UpdateAction, ctx: &ActionContext) {
    match action {
        UpdateAction::SetUiccSubscription {
            slot,
            app_index,
            family,
            desired,
        } => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                execute_set_uicc(ctx, slot, app_index, family, desired).await;
            });
        }

        UpdateAction::BroadcastSetUiccResult {
            slot,
            sub_id,
            desired,
            outcome,
        } => {
            info!(
                "set-uicc result slot {} sub {:?} state {}: {:?}",
                slot, sub_id, desired, outcome
            );
            ctx.emit(EngineEvent::set_uicc_result(slot, sub_id, desired, outcome));
        }

        UpdateAction::UpdateUserPrefs { trigger_dds } => {
            ctx.user_prefs.update_user_prefs(trigger_dds);
            ctx.emit(EngineEvent::UserPrefsUpdated { trigger_dds });
        }

        UpdateAction::SetPreferredNetworkModes { modes } => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                execute_set_network_modes(ctx, modes).await;
            });
        }

        UpdateAction::QueryNetworkMode { slot } => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                execute_query_network_mode(ctx, slot).await;
            });
        }
    }
}

async fn execute_set_uicc(
    ctx: ActionContext,
    slot: SlotId,
    app_index: usize,
    family: AppFamily,
    desired: SubState,
) {
    let succeeded = match ctx
        .binding
        .set_uicc_subscription(slot, app_index, desired)
        .await
    {
        Ok(succeeded) => succeeded,
        Err(e) if e.is_transport() => {
            warn!("set-uicc slot {} {} ({}) got no answer: {}", slot, family, desired, e);
            false
        }
        Err(e) => {
            error!("set-uicc slot {} {} ({}) not sent: {}", slot, family, desired, e);
            false
        }
    };

    let msg = Message::SetUiccDone {
        slot,
        family,
        desired,
        succeeded,
    };
    if ctx.msg_tx.send(msg).await.is_err() {
        debug!("Coordinator gone before set-uicc completion for slot {}", slot);
    }
}

async fn execute_set_network_modes(ctx: ActionContext, modes: Vec<NetworkMode>) {
    let succeeded = match ctx.binding.update_preferred_network_types(&modes).await {
        Ok(succeeded) => succeeded,
        Err(e) => {
            error!("Failed to push preferred network modes: {}", e);
            false
        }
    };

    ctx.emit(EngineEvent::NetworkModePushed { modes, succeeded });
    let _ = ctx
        .msg_tx
        .send(Message::SetNetworkModeDone { succeeded })
        .await;
}

async fn execute_query_network_mode(ctx: ActionContext, slot: SlotId) {
    let mode = match ctx.binding.get_preferred_network_type(slot).await {
        Ok(mode) => mode,
        Err(e) => {
            error!("Network mode query for slot {} failed: {}", slot, e);
            None
        }
    };

    let _ = ctx
        .msg_tx
        .send(Message::NetworkModeQueried { slot, mode })
        .await;
}
