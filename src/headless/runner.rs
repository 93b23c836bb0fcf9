//! Headless runner - daemon event loop with NDJSON output
//!
//! Wires the in-memory stores and a simulated modem to the engine, runs a
//! stack-ready activation round and then serves commands read from stdin
//! until shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use simsub_app::config::{self, Settings};
use simsub_app::{Engine, EngineEvent, MemoryServices, Message};
use simsub_core::prelude::*;
use simsub_core::{NetworkMode, PlmnOverride, RefreshKind, SimPresence, SlotId};
use simsub_modem::{SimulatedModem, SimulatedSlot};

use super::{emit_engine_event, emit_error, emit_plmn_lookup};

/// Network mode the simulated device is provisioned with
const PROVISIONED_NETWORK_MODE: NetworkMode = NetworkMode(9);

/// A command typed on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
enum StdinCommand {
    Send(Message),
    PlmnLookup(String),
}

/// Run the daemon in headless mode
pub async fn run_headless(config_path: &Path, slots_override: Option<usize>) -> Result<()> {
    let mut settings = config::load_settings(config_path);
    if let Some(slots) = slots_override {
        settings.device.slots = slots;
    }

    info!("═══════════════════════════════════════════════════════");
    info!("simsubd starting in HEADLESS mode");
    info!("Config: {}", config_path.display());
    info!("Slots: {}", settings.device.slots);
    info!("═══════════════════════════════════════════════════════");

    let plmn = Arc::new(PlmnOverride::load(&settings.plmn.override_file));
    info!("PLMN overrides loaded: {}", plmn.len());

    let stores = MemoryServices::provisioned(settings.device.slots, PROVISIONED_NETWORK_MODE);
    let (binding, modem) = SimulatedModem::start(
        vec![SimulatedSlot::default(); settings.device.slots],
        settings.modem.command_timeout(),
    );

    let mut engine = match Engine::new(settings.clone(), stores.services(), binding) {
        Ok(engine) => engine,
        Err(e) => {
            emit_error(&e.to_string(), true);
            modem.shutdown().await;
            return Err(e);
        }
    };

    let printer = spawn_event_printer(engine.subscribe());

    let stdin_tx = engine.msg_sender();
    let slots = settings.device.slots;
    let stdin_plmn = plmn.clone();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(stdin_tx, slots, &stdin_plmn);
    });

    headless_auto_start(&mut engine, &settings)?;

    engine.run().await;

    engine.shutdown().await;
    modem.shutdown().await;

    // Let the printer flush the shutdown event
    let _ = tokio::time::timeout(Duration::from_millis(500), printer).await;

    info!("simsubd headless mode exiting");
    Ok(())
}

/// Boot sequence: seed network modes, bridge modem indications and
/// activate every slot as if the modem stack just became ready
fn headless_auto_start(engine: &mut Engine, settings: &Settings) -> Result<()> {
    engine.reconcile_network_modes_on_boot();
    engine.spawn_indication_bridge();
    engine.update_subscription_activation(vec![SimPresence::Present; settings.device.slots], true)
}

/// Print every engine event until the engine shuts down
fn spawn_event_printer(
    mut events: broadcast::Receiver<EngineEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    emit_engine_event(&event);
                    if matches!(event, EngineEvent::Shutdown) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, {} events dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Blocking stdin reader for headless mode
fn spawn_stdin_reader_blocking(msg_tx: mpsc::Sender<Message>, slots: usize, plmn: &PlmnOverride) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_command(&line, slots) {
            Some(StdinCommand::Send(msg)) => {
                let quit = msg == Message::Shutdown;
                info!("Stdin: {:?}", msg);
                if msg_tx.blocking_send(msg).is_err() || quit {
                    break;
                }
            }
            Some(StdinCommand::PlmnLookup(numeric)) => {
                emit_plmn_lookup(&numeric, plmn.plmn(&numeric));
            }
            None if line.trim().is_empty() => {}
            None => warn!("Unknown stdin command: {}", line.trim()),
        }
    }

    info!("Stdin reader exiting");
}

/// Parse one stdin line.
///
/// ```text
/// activate | a       activation round, every SIM present
/// ready              activation round after the modem stack became ready
/// absent <slot>      activation round with the SIM in <slot> removed
/// refresh <slot>     card reset in <slot>
/// sync               push network modes to the modem
/// plmn <numeric>     look up a PLMN override
/// quit | q           shut down
/// ```
fn parse_command(line: &str, slots: usize) -> Option<StdinCommand> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let arg = words.next();

    let slot_arg = || -> Option<SlotId> { arg?.parse().ok().filter(|slot| *slot < slots) };

    let msg = match command {
        "a" | "activate" => Message::UpdateSubActivation {
            sim_status: vec![SimPresence::Present; slots],
            stack_ready: false,
        },
        "ready" => Message::UpdateSubActivation {
            sim_status: vec![SimPresence::Present; slots],
            stack_ready: true,
        },
        "absent" => {
            let absent = slot_arg()?;
            let sim_status = (0..slots)
                .map(|slot| {
                    if slot == absent {
                        SimPresence::NotInserted
                    } else {
                        SimPresence::Present
                    }
                })
                .collect();
            Message::UpdateSubActivation {
                sim_status,
                stack_ready: false,
            }
        }
        "refresh" => Message::IccRefresh {
            slot: slot_arg()?,
            kind: RefreshKind::Reset,
        },
        "sync" => Message::UpdateNetworkMode,
        "plmn" => return arg.map(|numeric| StdinCommand::PlmnLookup(numeric.to_string())),
        "q" | "quit" => Message::Shutdown,
        _ => return None,
    };

    Some(StdinCommand::Send(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activate() {
        assert_eq!(
            parse_command("activate", 2),
            Some(StdinCommand::Send(Message::UpdateSubActivation {
                sim_status: vec![SimPresence::Present; 2],
                stack_ready: false,
            }))
        );
        assert_eq!(parse_command("  a  ", 2), parse_command("activate", 2));
    }

    #[test]
    fn test_parse_absent_slot() {
        assert_eq!(
            parse_command("absent 1", 2),
            Some(StdinCommand::Send(Message::UpdateSubActivation {
                sim_status: vec![SimPresence::Present, SimPresence::NotInserted],
                stack_ready: false,
            }))
        );
        assert_eq!(parse_command("absent 2", 2), None);
        assert_eq!(parse_command("absent", 2), None);
    }

    #[test]
    fn test_parse_refresh() {
        assert_eq!(
            parse_command("refresh 0", 1),
            Some(StdinCommand::Send(Message::IccRefresh {
                slot: 0,
                kind: RefreshKind::Reset,
            }))
        );
        assert_eq!(parse_command("refresh x", 1), None);
    }

    #[test]
    fn test_parse_plmn_and_quit() {
        assert_eq!(
            parse_command("plmn 310260", 1),
            Some(StdinCommand::PlmnLookup("310260".to_string()))
        );
        assert_eq!(parse_command("plmn", 1), None);
        assert_eq!(
            parse_command("q", 1),
            Some(StdinCommand::Send(Message::Shutdown))
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse_command("", 2), None);
        assert_eq!(parse_command("reload", 2), None);
    }
}
