//! Test utilities for modem types
//!
//! Provides helpers for standing up simulated modems in tests.

use std::time::Duration;

use crate::binding::ModemBinding;
use crate::loopback::{SimulatedModem, SimulatedSlot};

/// Command timeout used by test modems; short so silent slots fail fast
pub const TEST_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Starts a simulated modem with `slots` default slots (USIM + CSIM card each).
pub fn test_modem(slots: usize) -> (ModemBinding, SimulatedModem) {
    test_modem_with(vec![SimulatedSlot::default(); slots])
}

/// Starts a simulated modem with explicit per-slot behaviour.
pub fn test_modem_with(slots: Vec<SimulatedSlot>) -> (ModemBinding, SimulatedModem) {
    SimulatedModem::start(slots, TEST_COMMAND_TIMEOUT)
}
