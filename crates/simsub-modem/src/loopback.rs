//! In-process simulated modem
//!
//! Speaks the same line protocol as a real modem over in-memory duplex
//! pipes. Used by the `simsubd` binary when no hardware channel is
//! configured, and by tests that need scripted modem behaviour.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use simsub_core::prelude::*;
use simsub_core::{AppFamily, AppType, NetworkMode, RefreshKind, SlotId};

use crate::binding::ModemBinding;
use crate::connection::ModemConnection;

const PIPE_CAPACITY: usize = 4096;

/// Scripted behaviour of one simulated slot
#[derive(Debug, Clone)]
pub struct SimulatedSlot {
    /// Applications on the card, indexed by application index
    pub apps: Vec<AppType>,
    /// Families whose set-uicc requests are answered with an error
    pub failing_families: Vec<AppFamily>,
    /// Mode the modem currently runs with
    pub network_mode: NetworkMode,
    pub reject_network_mode: bool,
    pub fail_network_query: bool,
    /// Swallow every request without answering
    pub silent: bool,
}

impl Default for SimulatedSlot {
    fn default() -> Self {
        Self {
            apps: vec![AppType::Usim, AppType::Csim],
            failing_families: Vec::new(),
            network_mode: NetworkMode(9),
            reject_network_mode: false,
            fail_network_query: false,
            silent: false,
        }
    }
}

impl SimulatedSlot {
    pub fn with_apps(mut self, apps: Vec<AppType>) -> Self {
        self.apps = apps;
        self
    }

    pub fn failing(mut self, family: AppFamily) -> Self {
        self.failing_families.push(family);
        self
    }

    pub fn with_network_mode(mut self, mode: NetworkMode) -> Self {
        self.network_mode = mode;
        self
    }
}

/// A request the simulated modem received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub slot: SlotId,
    pub method: String,
    pub params: Value,
}

type CommandLog = Arc<Mutex<Vec<RecordedCommand>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Control handle for a running simulated modem
pub struct SimulatedModem {
    slots: Vec<Arc<Mutex<SimulatedSlot>>>,
    controls: Vec<mpsc::Sender<String>>,
    log: CommandLog,
    connections: Vec<ModemConnection>,
    servers: Vec<JoinHandle<()>>,
}

impl SimulatedModem {
    /// Start one simulated modem per slot and return the binding wired to them
    pub fn start(slots: Vec<SimulatedSlot>, command_timeout: Duration) -> (ModemBinding, Self) {
        let (indication_tx, indication_rx) = mpsc::channel(32);
        let log: CommandLog = Arc::default();

        let mut states = Vec::with_capacity(slots.len());
        let mut controls = Vec::with_capacity(slots.len());
        let mut connections = Vec::with_capacity(slots.len());
        let mut servers = Vec::with_capacity(slots.len());
        let mut senders = Vec::with_capacity(slots.len());

        for (slot, config) in slots.into_iter().enumerate() {
            let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
            let (client_read, client_write) = tokio::io::split(client);

            let connection =
                ModemConnection::spawn(slot, client_read, client_write, indication_tx.clone());
            senders.push(connection.command_sender(command_timeout));

            let state = Arc::new(Mutex::new(config));
            let (control_tx, control_rx) = mpsc::channel(8);
            servers.push(tokio::spawn(serve(
                slot,
                server,
                state.clone(),
                log.clone(),
                control_rx,
            )));

            states.push(state);
            controls.push(control_tx);
            connections.push(connection);
        }

        debug!("Simulated modem started with {} slots", states.len());

        let binding = ModemBinding::new(senders, indication_rx);
        let modem = Self {
            slots: states,
            controls,
            log,
            connections,
            servers,
        };
        (binding, modem)
    }

    /// Have the card in `slot` report a refresh
    pub async fn inject_refresh(&self, slot: SlotId, kind: RefreshKind) -> Result<()> {
        let control = self
            .controls
            .get(slot)
            .ok_or_else(|| Error::invalid_slot(slot, self.controls.len()))?;
        let line = json!({
            "event": "iccRefresh",
            "params": { "slot": slot, "result": kind },
        })
        .to_string();
        control
            .send(line)
            .await
            .map_err(|_| Error::channel_send("simulated modem control"))
    }

    /// Change a slot's scripted behaviour while running
    pub fn configure(&self, slot: SlotId, f: impl FnOnce(&mut SimulatedSlot)) {
        if let Some(state) = self.slots.get(slot) {
            f(&mut lock(state));
        }
    }

    /// Mode the modem in `slot` currently runs with
    pub fn network_mode(&self, slot: SlotId) -> Option<NetworkMode> {
        self.slots.get(slot).map(|s| lock(s).network_mode)
    }

    pub fn commands(&self) -> Vec<RecordedCommand> {
        lock(&self.log).clone()
    }

    pub fn commands_for(&self, method: &str) -> Vec<RecordedCommand> {
        lock(&self.log)
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn command_count(&self) -> usize {
        lock(&self.log).len()
    }

    pub async fn shutdown(self) {
        for connection in self.connections {
            connection.shutdown().await;
        }
        for server in self.servers {
            server.abort();
        }
    }
}

/// Serve one slot: answer requests and forward injected indications
async fn serve(
    slot: SlotId,
    stream: DuplexStream,
    state: Arc<Mutex<SimulatedSlot>>,
    log: CommandLog,
    mut control_rx: mpsc::Receiver<String>,
) {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    loop {
        let outgoing = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => respond(slot, &line, &state, &log),
                _ => break,
            },
            Some(indication) = control_rx.recv() => Some(indication),
        };

        let Some(outgoing) = outgoing else {
            continue;
        };
        if write.write_all(outgoing.as_bytes()).await.is_err()
            || write.write_all(b"\n").await.is_err()
        {
            break;
        }
    }

    trace!("Simulated modem for slot {} stopped", slot);
}

/// Build the reply line for one request, or `None` to stay silent
fn respond(slot: SlotId, line: &str, state: &Mutex<SimulatedSlot>, log: &CommandLog) -> Option<String> {
    let request: Value = serde_json::from_str(line).ok()?;
    let id = request.get("id")?.as_u64()?;
    let method = request.get("method")?.as_str()?.to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    lock(log).push(RecordedCommand {
        slot,
        method: method.clone(),
        params: params.clone(),
    });

    let mut state = lock(state);
    if state.silent {
        return None;
    }

    let reply = match method.as_str() {
        "uicc.setSubscription" => {
            let family = params
                .get("appIndex")
                .and_then(Value::as_u64)
                .and_then(|i| state.apps.get(i as usize))
                .and_then(AppType::family);
            match family {
                Some(family) if !state.failing_families.contains(&family) => {
                    json!({ "id": id, "result": {} })
                }
                _ => json!({ "id": id, "error": "GENERIC_FAILURE" }),
            }
        }
        "nw.getPreferredNetworkType" => {
            if state.fail_network_query {
                json!({ "id": id, "error": "RADIO_NOT_AVAILABLE" })
            } else {
                json!({ "id": id, "result": [state.network_mode] })
            }
        }
        "nw.setPreferredNetworkType" => {
            let mode = params.get("mode").and_then(Value::as_i64);
            match mode {
                Some(mode) if !state.reject_network_mode => {
                    state.network_mode = NetworkMode(mode as i32);
                    json!({ "id": id, "result": {} })
                }
                _ => json!({ "id": id, "error": "GENERIC_FAILURE" }),
            }
        }
        _ => json!({ "id": id, "error": "REQUEST_NOT_SUPPORTED" }),
    };

    Some(reply.to_string())
}
