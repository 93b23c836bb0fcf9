//! Message types for the coordinator (TEA pattern)

use simsub_core::{AppFamily, NetworkMode, RefreshKind, SimPresence, SlotId, SubState};

/// All messages that can be processed by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Subscription Activation
    // ─────────────────────────────────────────────────────────
    /// Drive activation for every slot from fresh SIM presence
    UpdateSubActivation {
        sim_status: Vec<SimPresence>,
        /// Sent because the modem stack became ready
        stack_ready: bool,
    },

    /// One family's set-uicc command completed
    SetUiccDone {
        slot: SlotId,
        family: AppFamily,
        desired: SubState,
        succeeded: bool,
    },

    /// The card in `slot` was refreshed
    IccRefresh { slot: SlotId, kind: RefreshKind },

    // ─────────────────────────────────────────────────────────
    // Network Mode
    // ─────────────────────────────────────────────────────────
    /// Seed subscription table modes still at the factory default
    ReconcileOnBoot,

    /// The preferred network mode setting changed
    NetworkModeSettingChanged,

    /// Push table modes to the modem if they differ from settings
    UpdateNetworkMode,

    /// Aggregated set-preferred-network-mode completed
    SetNetworkModeDone { succeeded: bool },

    /// Modem reported its current mode; `None` when the query failed
    NetworkModeQueried {
        slot: SlotId,
        mode: Option<NetworkMode>,
    },

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    Shutdown,
}
