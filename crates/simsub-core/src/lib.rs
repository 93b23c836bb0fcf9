//! # simsub-core - Core Domain Types
//!
//! Foundation crate for the multi-SIM subscription daemon. Provides slot and
//! subscription domain types, error handling, modem indications, logging
//! setup and the PLMN override table.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`SlotStatus`] - Coordinator view of a slot (Uninitialized, Active, SetFailed, ...)
//! - [`SubState`] - Persisted subscription state and set-uicc target
//! - [`AppType`], [`AppFamily`] - Card applications and their 3GPP / 3GPP2 family
//! - [`NetworkMode`] - Preferred network mode with range checks
//!
//! ### Events (`events`)
//! - [`ModemIndication`] - Unsolicited modem indications (SIM refresh)
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with fatal and transport classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! ```rust
//! use simsub_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod plmn;
pub mod types;

/// Prelude for common imports used throughout all simsub crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result};
pub use events::ModemIndication;
pub use plmn::{PlmnOverride, DEFAULT_PLMN_OVERRIDE_PATH};
pub use types::{
    is_valid_sub_id, AppFamily, AppType, NetworkMode, Outcome, RadioState, RefreshKind,
    SimPresence, SlotId, SlotStatus, SubId, SubState, MAX_SLOTS,
};
