//! # simsub-app - Subscription Activation Coordinator
//!
//! TEA-style coordinator that drives per-slot subscription activation and
//! preferred network mode reconciliation through a [`ModemBinding`].
//!
//! Depends on [`simsub_core`] for domain types and [`simsub_modem`] for the
//! modem channels.
//!
//! ## Public API
//!
//! ### Engine
//! - [`Engine`] - Owns the state, the message channel and the event broadcaster
//! - [`EngineEvent`] - Set-uicc results, slot status changes, preference updates
//!
//! ### TEA
//! - [`Message`] - Everything the coordinator reacts to
//! - [`AppState`] - The Model
//! - [`handler::update()`] - The update function
//!
//! ### Collaborators
//! - [`services`] - Subscription table, settings store, card, radio and
//!   user-preference seams, with in-memory implementations
//!
//! ### Configuration
//! - [`Settings`] - Loaded from TOML via [`config::load_settings()`]
//!
//! [`ModemBinding`]: simsub_modem::ModemBinding

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod message;
pub mod process;
pub mod services;
pub mod signals;
pub mod state;
pub mod transaction;

pub use config::Settings;
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use services::memory::MemoryServices;
pub use services::{
    CardEnumerator, RadioStatus, Services, SettingsStore, SubscriptionTable, UserPrefsUpdater,
};
pub use state::AppState;
pub use transaction::{AppResult, AppResults, SetUiccTransaction};
