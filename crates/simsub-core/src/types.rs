//! Core domain types for SIM slots, card applications and subscriptions

use serde::{Deserialize, Serialize};

/// Index of a physical SIM/UICC slot (`0..N-1`)
pub type SlotId = usize;

/// Subscription identifier as stored in the subscription table
pub type SubId = i64;

/// Upper bound on radio slots a device may be configured with
pub const MAX_SLOTS: usize = 4;

/// Returns true for subscription ids that refer to a real table row
pub fn is_valid_sub_id(sub_id: SubId) -> bool {
    sub_id > 0
}

// ─────────────────────────────────────────────────────────────────
// Subscription State
// ─────────────────────────────────────────────────────────────────

/// Persisted subscription state, also the target of a set-uicc request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubState {
    Inactive,
    Active,
}

impl SubState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubState::Inactive => "inactive",
            SubState::Active => "active",
        }
    }
}

impl std::fmt::Display for SubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The coordinator's cached status for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Not yet activated, or reset by a refresh / radio event
    #[default]
    Uninitialized,
    Active,
    Inactive,
    SimNotInserted,
    /// Last set-uicc attempt failed; retried on the next activation call
    SetFailed,
}

impl SlotStatus {
    /// A slot counts towards "all subscriptions available" once it has left
    /// `Uninitialized`, whatever the outcome.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SlotStatus::Uninitialized)
    }

    /// Whether this cached status already reflects the given persisted state
    pub fn matches(&self, state: SubState) -> bool {
        *self == SlotStatus::from(state)
    }
}

impl From<SubState> for SlotStatus {
    fn from(state: SubState) -> Self {
        match state {
            SubState::Active => SlotStatus::Active,
            SubState::Inactive => SlotStatus::Inactive,
        }
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotStatus::Uninitialized => "uninitialized",
            SlotStatus::Active => "active",
            SlotStatus::Inactive => "inactive",
            SlotStatus::SimNotInserted => "sim_not_inserted",
            SlotStatus::SetFailed => "set_failed",
        };
        f.write_str(s)
    }
}

/// SIM presence reported by the card layer for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPresence {
    NotInserted,
    /// Card present; consult the subscription table for the desired state
    Present,
}

// ─────────────────────────────────────────────────────────────────
// Card Applications
// ─────────────────────────────────────────────────────────────────

/// UICC application type as enumerated from a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Unknown,
    Sim,
    Usim,
    Ruim,
    Csim,
    Isim,
}

impl AppType {
    /// The family a set-uicc command is issued for, if any
    pub fn family(&self) -> Option<AppFamily> {
        match self {
            AppType::Sim | AppType::Usim => Some(AppFamily::ThreeGpp),
            AppType::Ruim | AppType::Csim => Some(AppFamily::ThreeGpp2),
            AppType::Unknown | AppType::Isim => None,
        }
    }
}

/// Application family: at most one set-uicc command is issued per family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppFamily {
    #[serde(rename = "3gpp")]
    ThreeGpp,
    #[serde(rename = "3gpp2")]
    ThreeGpp2,
}

impl std::fmt::Display for AppFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppFamily::ThreeGpp => f.write_str("3gpp"),
            AppFamily::ThreeGpp2 => f.write_str("3gpp2"),
        }
    }
}

/// Aggregate result of a set-uicc attempt, as broadcast to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Numeric result code carried in the set-uicc result broadcast
    pub fn code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
        }
    }
}

/// Kind of SIM refresh signalled by the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshKind {
    FileUpdate,
    Init,
    /// Full card reset; subscriptions must be activated again
    Reset,
}

/// Radio power state of one slot's modem stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioState {
    Off,
    #[default]
    On,
    /// Modem subsystem restarting or RIL not connected
    Unavailable,
}

impl RadioState {
    pub fn is_on(&self) -> bool {
        matches!(self, RadioState::On)
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, RadioState::Unavailable)
    }
}

// ─────────────────────────────────────────────────────────────────
// Network Mode
// ─────────────────────────────────────────────────────────────────

/// Preferred network mode value as exchanged with the modem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkMode(pub i32);

impl NetworkMode {
    /// GSM/WCDMA, WCDMA preferred; lowest enumerated mode
    pub const WCDMA_PREF: Self = Self(0);
    /// TD-SCDMA/LTE/CDMA/EvDo/GSM/WCDMA; highest enumerated mode
    pub const TD_SCDMA_LTE_CDMA_EVDO_GSM_WCDMA: Self = Self(22);
    /// Compiled-in default used when the settings store has no value
    pub const PREFERRED: Self = Self::WCDMA_PREF;
    /// Factory default stored in a fresh subscription table row
    pub const TABLE_DEFAULT: Self = Self(-1);

    /// Whether the value lies in the enumerated range the modem accepts
    pub fn is_valid(&self) -> bool {
        (Self::WCDMA_PREF.0..=Self::TD_SCDMA_LTE_CDMA_EVDO_GSM_WCDMA.0).contains(&self.0)
    }

    pub fn is_table_default(&self) -> bool {
        *self == Self::TABLE_DEFAULT
    }
}

impl std::fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
