//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `activation`: Set-uicc issuance, completion verdicts and round completion
//! - `refresh`: SIM refresh and ICC event gating
//! - `network_mode`: Network mode reconciliation and modem push

pub(crate) mod activation;
pub(crate) mod network_mode;
pub(crate) mod refresh;
pub(crate) mod update;


use simsub_core::{AppFamily, NetworkMode, Outcome, SlotId, SubId, SubState};

use crate::message::Message;

// Re-export main entry point
pub use update::update;

pub(crate) use network_mode::{reconcile_on_demand, reconcile_table};
pub(crate) use refresh::should_process_icc_event;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Send one family's set-uicc command to the modem
    SetUiccSubscription {
        slot: SlotId,
        app_index: usize,
        family: AppFamily,
        desired: SubState,
    },

    /// Publish the aggregate result of a slot's set-uicc attempt
    BroadcastSetUiccResult {
        slot: SlotId,
        sub_id: Option<SubId>,
        desired: SubState,
        outcome: Outcome,
    },

    /// Every slot resolved: recompute user preferred subscriptions
    UpdateUserPrefs { trigger_dds: bool },

    /// Push one preferred network mode per slot to the modem
    SetPreferredNetworkModes { modes: Vec<NetworkMode> },

    /// Ask the modem which network mode `slot` currently uses
    QueryNetworkMode { slot: SlotId },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Actions for the event loop to perform, in order
    pub actions: Vec<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            actions: Vec::new(),
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            actions: vec![action],
        }
    }

    pub fn actions(actions: Vec<UpdateAction>) -> Self {
        Self {
            message: None,
            actions,
        }
    }
}
