//! # simsub-modem - Modem Channel Management
//!
//! Line-delimited JSON request/response plumbing between the coordinator and
//! each slot's modem, plus an in-process simulated modem.
//!
//! Depends on [`simsub_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Commands
//! - [`ModemCommand`] - Set-uicc and preferred network type requests
//! - [`CommandSender`] - Send a command and await its response with a timeout
//! - [`PendingRequests`] - Requests awaiting a reply, keyed by id
//! - [`ModemReply`] - A modem's answer to one request
//!
//! ### Transport
//! - [`ModemConnection`] - Reader/writer tasks over any async byte stream
//! - [`parse_modem_line()`] - Parse one line of modem output
//!
//! ### Binding
//! - [`ModemBinding`] - Per-slot senders plus the indication stream, claimable once
//! - [`ModemBindingPolicy`] - Push preferred network modes for all slots
//!
//! ### Simulation
//! - [`SimulatedModem`] - Scripted in-memory modem speaking the same protocol

pub mod binding;
pub mod commands;
pub mod connection;
pub mod loopback;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use binding::{LocalModemBindingPolicy, ModemBinding, ModemBindingPolicy};
pub use commands::{
    CommandSender, ModemCommand, ModemReply, PendingRequests, DEFAULT_COMMAND_TIMEOUT,
};
pub use connection::ModemConnection;
pub use loopback::{RecordedCommand, SimulatedModem, SimulatedSlot};
pub use protocol::{parse_modem_line, ModemMessage};
