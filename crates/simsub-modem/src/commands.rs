//! Requests to a slot's modem and the replies that answer them
//!
//! Each request line carries an `id`. The connection's reader hands the
//! matching reply back through [`PendingRequests`], which wakes whoever is
//! waiting in [`CommandSender::send`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};

use simsub_core::prelude::*;
use simsub_core::{NetworkMode, SlotId, SubState};

/// Default bound on how long a single command may stay pending
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// What the modem answered to one request
#[derive(Debug, Clone, PartialEq)]
pub struct ModemReply {
    pub id: u64,
    /// `Err` carries the modem's error text
    pub outcome: std::result::Result<Option<Value>, String>,
}

impl ModemReply {
    /// Build from the `result` / `error` members of a response line
    pub fn from_wire(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        let outcome = match error {
            None => Ok(result),
            Some(Value::String(text)) => Err(text),
            Some(other) => Err(other.to_string()),
        };
        Self { id, outcome }
    }

    pub fn ok(id: u64, result: Option<Value>) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    /// A reply synthesized locally because the modem never answered
    pub fn failed(id: u64, reason: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Err(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    /// Integer payload: a bare number, `[n, ..]` or `{"mode": n}`.
    pub fn int_value(&self) -> Option<i32> {
        let value = match self.outcome.as_ref().ok()?.as_ref()? {
            Value::Array(items) => items.first()?,
            Value::Object(fields) => fields.get("mode")?,
            scalar => scalar,
        };
        i32::try_from(value.as_i64()?).ok()
    }
}

struct Waiter {
    reply_tx: oneshot::Sender<ModemReply>,
    issued: Instant,
    method: &'static str,
}

/// Requests sent on one channel that have not been answered yet
#[derive(Default)]
pub struct PendingRequests {
    next_id: AtomicU64,
    waiters: Mutex<HashMap<u64, Waiter>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and a receiver for its reply
    pub async fn open(&self, method: &'static str) -> (u64, oneshot::Receiver<ModemReply>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.waiters.lock().await.insert(
            id,
            Waiter {
                reply_tx,
                issued: Instant::now(),
                method,
            },
        );
        (id, reply_rx)
    }

    /// Deliver a reply. `false` when nothing was waiting for `id`.
    pub async fn resolve(&self, reply: ModemReply) -> bool {
        let Some(waiter) = self.waiters.lock().await.remove(&reply.id) else {
            return false;
        };
        trace!(
            "#{} {} answered after {:?}",
            reply.id,
            waiter.method,
            waiter.issued.elapsed()
        );
        // The caller may have given up already
        let _ = waiter.reply_tx.send(reply);
        true
    }

    /// Stop waiting for `id` without answering it
    pub async fn abandon(&self, id: u64) -> bool {
        self.waiters.lock().await.remove(&id).is_some()
    }

    /// Answer every outstanding request with `reason`; returns how many there were
    pub async fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<_> = self.waiters.lock().await.drain().collect();
        let count = drained.len();
        for (id, waiter) in drained {
            let _ = waiter.reply_tx.send(ModemReply::failed(id, reason));
        }
        if count > 0 {
            debug!("Failed {} outstanding modem request(s): {}", count, reason);
        }
        count
    }

    pub async fn len(&self) -> usize {
        self.waiters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// A request the coordinator can make of a slot's modem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemCommand {
    /// Activate or deactivate one application of the card in `slot`
    SetUiccSubscription {
        slot: SlotId,
        app_index: usize,
        state: SubState,
    },
    /// Query the network mode the modem currently uses for `slot`
    GetPreferredNetworkType { slot: SlotId },
    /// Set the preferred network mode for `slot`
    SetPreferredNetworkType { slot: SlotId, mode: NetworkMode },
}

impl ModemCommand {
    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            ModemCommand::SetUiccSubscription { .. } => "uicc.setSubscription",
            ModemCommand::GetPreferredNetworkType { .. } => "nw.getPreferredNetworkType",
            ModemCommand::SetPreferredNetworkType { .. } => "nw.setPreferredNetworkType",
        }
    }

    fn params(&self) -> Value {
        match *self {
            // The session id mirrors the slot
            ModemCommand::SetUiccSubscription {
                slot,
                app_index,
                state,
            } => json!({
                "slot": slot,
                "appIndex": app_index,
                "sessionId": slot,
                "state": state,
            }),
            ModemCommand::GetPreferredNetworkType { slot } => json!({ "slot": slot }),
            ModemCommand::SetPreferredNetworkType { slot, mode } => {
                json!({ "slot": slot, "mode": mode })
            }
        }
    }

    /// One request line, without the trailing newline
    pub fn to_line(&self, id: u64) -> String {
        json!({ "id": id, "method": self.method(), "params": self.params() }).to_string()
    }
}

/// Sends commands down one slot's channel and waits for the replies
#[derive(Clone)]
pub struct CommandSender {
    line_tx: mpsc::Sender<String>,
    pending: Arc<PendingRequests>,
    timeout: Duration,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("timeout", &self.timeout)
            .field("closed", &self.line_tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl CommandSender {
    pub fn new(line_tx: mpsc::Sender<String>, pending: Arc<PendingRequests>) -> Self {
        Self {
            line_tx,
            pending,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A sender whose channel nobody reads
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn disconnected() -> Self {
        let (line_tx, _) = mpsc::channel(1);
        Self::new(line_tx, Arc::new(PendingRequests::new()))
    }

    pub fn pending(&self) -> &Arc<PendingRequests> {
        &self.pending
    }

    /// Send with the configured timeout
    pub async fn send(&self, command: ModemCommand) -> Result<ModemReply> {
        self.send_within(command, self.timeout).await
    }

    /// Send and wait at most `limit` for the reply.
    ///
    /// A timeout drops only this request; others on the same channel stay
    /// pending.
    pub async fn send_within(&self, command: ModemCommand, limit: Duration) -> Result<ModemReply> {
        let method = command.method();
        let (id, reply_rx) = self.pending.open(method).await;

        debug!("#{} -> {}", id, method);
        if self.line_tx.send(command.to_line(id)).await.is_err() {
            self.pending.abandon(id).await;
            return Err(Error::channel_send("modem command channel"));
        }

        match tokio::time::timeout(limit, reply_rx).await {
            Ok(Ok(reply)) => {
                debug!("#{} <- {} ok={}", id, method, reply.is_ok());
                Ok(reply)
            }
            Ok(Err(_)) => Err(Error::modem(format!("{} dropped without a reply", method))),
            Err(_) => {
                self.pending.abandon(id).await;
                Err(Error::command_timeout(method, limit.as_millis() as u64))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_mode(slot: SlotId) -> ModemCommand {
        ModemCommand::GetPreferredNetworkType { slot }
    }

    #[tokio::test]
    async fn test_ids_are_per_channel_and_increasing() {
        let pending = PendingRequests::new();
        let (first, _rx1) = pending.open("a").await;
        let (second, _rx2) = pending.open("b").await;

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(pending.len().await, 2);

        let other = PendingRequests::new();
        assert_eq!(other.open("a").await.0, 1);
    }

    #[tokio::test]
    async fn test_resolve_wakes_waiter() {
        let pending = PendingRequests::new();
        let (id, rx) = pending.open("nw.getPreferredNetworkType").await;

        assert!(pending.resolve(ModemReply::from_wire(id, Some(json!([9])), None)).await);
        assert!(pending.is_empty().await);

        let reply = rx.await.unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.int_value(), Some(9));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id() {
        let pending = PendingRequests::new();
        assert!(!pending.resolve(ModemReply::ok(42, None)).await);
    }

    #[tokio::test]
    async fn test_fail_all_answers_everyone() {
        let pending = PendingRequests::new();
        let (_, rx1) = pending.open("a").await;
        let (_, rx2) = pending.open("b").await;

        assert_eq!(pending.fail_all("modem gone").await, 2);
        assert!(pending.is_empty().await);

        assert_eq!(rx1.await.unwrap().error(), Some("modem gone"));
        assert!(!rx2.await.unwrap().is_ok());
    }

    #[test]
    fn test_reply_from_wire_error_text() {
        let reply = ModemReply::from_wire(2, None, Some(json!("GENERIC_FAILURE")));
        assert_eq!(reply.error(), Some("GENERIC_FAILURE"));

        let reply = ModemReply::from_wire(3, None, Some(json!({ "code": 2 })));
        assert_eq!(reply.error(), Some("{\"code\":2}"));
    }

    #[test]
    fn test_reply_int_value_shapes() {
        assert_eq!(ModemReply::ok(1, Some(json!(3))).int_value(), Some(3));
        assert_eq!(ModemReply::ok(1, Some(json!({ "mode": 22 }))).int_value(), Some(22));
        assert_eq!(ModemReply::ok(1, Some(json!("nine"))).int_value(), None);
        assert_eq!(ModemReply::ok(1, Some(json!([]))).int_value(), None);
        assert_eq!(ModemReply::ok(1, None).int_value(), None);
        assert_eq!(ModemReply::failed(1, "x").int_value(), None);
    }

    #[test]
    fn test_set_uicc_line() {
        let command = ModemCommand::SetUiccSubscription {
            slot: 1,
            app_index: 2,
            state: SubState::Active,
        };
        let line: Value = serde_json::from_str(&command.to_line(7)).unwrap();

        assert_eq!(
            line,
            json!({
                "id": 7,
                "method": "uicc.setSubscription",
                "params": { "slot": 1, "appIndex": 2, "sessionId": 1, "state": "active" },
            })
        );
    }

    #[test]
    fn test_network_type_lines() {
        let set = ModemCommand::SetPreferredNetworkType {
            slot: 0,
            mode: NetworkMode(9),
        };
        let line: Value = serde_json::from_str(&set.to_line(1)).unwrap();
        assert_eq!(line["method"], "nw.setPreferredNetworkType");
        assert_eq!(line["params"]["mode"], 9);

        let line: Value = serde_json::from_str(&get_mode(1).to_line(2)).unwrap();
        assert_eq!(line["method"], "nw.getPreferredNetworkType");
        assert_eq!(line["params"], json!({ "slot": 1 }));
    }

    #[tokio::test]
    async fn test_send_receives_reply() {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(4);
        let pending = Arc::new(PendingRequests::new());
        let sender = CommandSender::new(line_tx, pending.clone());

        tokio::spawn(async move {
            let line = line_rx.recv().await.unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            let id = request["id"].as_u64().unwrap();
            pending.resolve(ModemReply::ok(id, Some(json!(0)))).await;
        });

        let reply = sender.send(get_mode(0)).await.unwrap();
        assert_eq!(reply.int_value(), Some(0));
    }

    #[tokio::test]
    async fn test_timeout_leaves_other_requests_pending() {
        let (line_tx, _line_rx) = mpsc::channel::<String>(4);
        let pending = Arc::new(PendingRequests::new());
        let sender = CommandSender::new(line_tx, pending.clone());
        let (_other, _other_rx) = pending.open("other").await;

        let err = sender
            .send_within(get_mode(0), Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandTimeout { .. }));
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn test_send_on_closed_channel() {
        let sender = CommandSender::disconnected();

        let err = sender.send(get_mode(0)).await.unwrap_err();
        assert!(matches!(err, Error::ChannelSend { .. }));
        assert!(sender.pending().is_empty().await);
    }
}
