//! Headless mode - JSON event output
//!
//! The daemon prints every engine event to stdout as NDJSON
//! (newline-delimited JSON), one event per line. Each line carries an
//! "event" field naming its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"slot_status_changed","slot":1,"old_status":"uninitialized","new_status":"sim_not_inserted"}
//! {"event":"set_uicc_result","slot":0,"sub_id":1,"new_state":"active","outcome":"success","code":0,"at":"2026-01-08T10:00:01.000+01:00"}
//! {"event":"user_prefs_updated","trigger_dds":true}
//! ```

pub mod runner;

use std::io::{self, Write};

use serde::Serialize;
use serde_json::json;

use simsub_app::EngineEvent;
use simsub_core::prelude::*;

/// Write one serializable value to stdout as a JSON line
fn emit_line(value: &impl Serialize) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize headless event: {}", e);
            return;
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", json) {
        error!("Failed to write headless event to stdout: {}", e);
        return;
    }

    // Flush to ensure immediate output
    if let Err(e) = stdout.flush() {
        error!("Failed to flush headless stdout: {}", e);
    }
}

pub fn emit_engine_event(event: &EngineEvent) {
    emit_line(event);
}

/// Result of a PLMN override lookup requested on stdin
pub fn emit_plmn_lookup(numeric: &str, plmn: Option<&str>) {
    emit_line(&json!({
        "event": "plmn_lookup",
        "numeric": numeric,
        "plmn": plmn,
    }));
}

pub fn emit_error(message: &str, fatal: bool) {
    emit_line(&json!({
        "event": "error",
        "message": message,
        "fatal": fatal,
    }));
}
