//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast via `Engine::subscribe()`. Set-uicc results double
//! as the daemon's result broadcast: listeners receive the slot, the
//! subscription, the requested state and the outcome.

use chrono::{DateTime, Local};
use serde::Serialize;

use simsub_core::{NetworkMode, Outcome, SlotId, SlotStatus, SubId, SubState};

/// Domain events emitted by the Engine for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Subscription Activation
    // ─────────────────────────────────────────────────────────
    /// Aggregate result of one slot's set-uicc attempt
    SetUiccResult {
        slot: SlotId,
        sub_id: Option<SubId>,
        new_state: SubState,
        outcome: Outcome,
        /// Numeric result code (0 success, 1 failure)
        code: i32,
        at: DateTime<Local>,
    },

    /// A slot's coordinator status changed
    SlotStatusChanged {
        slot: SlotId,
        old_status: SlotStatus,
        new_status: SlotStatus,
    },

    /// User preferred subscriptions were recomputed after a resolved round
    UserPrefsUpdated { trigger_dds: bool },

    // ─────────────────────────────────────────────────────────
    // Network Mode
    // ─────────────────────────────────────────────────────────
    /// Preferred network modes were pushed to the modem
    NetworkModePushed {
        modes: Vec<NetworkMode>,
        succeeded: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    pub fn set_uicc_result(
        slot: SlotId,
        sub_id: Option<SubId>,
        new_state: SubState,
        outcome: Outcome,
    ) -> Self {
        Self::SetUiccResult {
            slot,
            sub_id,
            new_state,
            outcome,
            code: outcome.code(),
            at: Local::now(),
        }
    }

    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SetUiccResult { .. } => "set_uicc_result",
            Self::SlotStatusChanged { .. } => "slot_status_changed",
            Self::UserPrefsUpdated { .. } => "user_prefs_updated",
            Self::NetworkModePushed { .. } => "network_mode_pushed",
            Self::Shutdown => "shutdown",
        }
    }
}
