//! Line-oriented transport to one slot's modem
//!
//! A connection owns two tasks: a writer draining request lines to the
//! transport, and a reader routing responses to the [`PendingRequests`] and
//! indications to the shared indication channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use simsub_core::prelude::*;
use simsub_core::{ModemIndication, SlotId};

use crate::commands::{CommandSender, ModemReply, PendingRequests};
use crate::protocol::{parse_modem_line, ModemMessage};

/// Capacity of the outbound request line queue
const LINE_QUEUE: usize = 32;

/// A running connection to one slot's modem
pub struct ModemConnection {
    slot: SlotId,
    line_tx: mpsc::Sender<String>,
    pending: Arc<PendingRequests>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl ModemConnection {
    /// Start reader and writer tasks over the given transport halves
    pub fn spawn<R, W>(
        slot: SlotId,
        reader: R,
        writer: W,
        indication_tx: mpsc::Sender<ModemIndication>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::channel::<String>(LINE_QUEUE);
        let pending = Arc::new(PendingRequests::new());

        let reader_handle = tokio::spawn(Self::line_reader(
            slot,
            reader,
            pending.clone(),
            indication_tx,
        ));
        let writer_handle = tokio::spawn(Self::line_writer(slot, writer, line_rx));

        info!("Modem connection for slot {} started", slot);

        Self {
            slot,
            line_tx,
            pending,
            reader_handle,
            writer_handle,
        }
    }

    /// Read lines from the modem and route them
    async fn line_reader<R>(
        slot: SlotId,
        reader: R,
        pending: Arc<PendingRequests>,
        indication_tx: mpsc::Sender<ModemIndication>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            trace!("slot {} <- {}", slot, line);

            match parse_modem_line(&line) {
                Some(ModemMessage::Response { id, result, error }) => {
                    if !pending.resolve(ModemReply::from_wire(id, result, error)).await {
                        debug!("slot {}: response #{} matched no pending request", slot, id);
                    }
                }
                Some(ModemMessage::Indication(indication)) => {
                    debug!("slot {}: {}", slot, indication.summary());
                    if indication_tx.send(indication).await.is_err() {
                        debug!("indication channel closed");
                        break;
                    }
                }
                Some(ModemMessage::UnknownEvent { event }) => {
                    trace!("slot {}: ignoring event {}", slot, event);
                }
                None => warn!("slot {}: unparseable modem line: {}", slot, line),
            }
        }

        // Nobody will answer what is still outstanding
        pending.fail_all("Modem channel closed").await;
        info!("Modem reader for slot {} finished", slot);
    }

    /// Write request lines to the modem
    async fn line_writer<W>(slot: SlotId, mut writer: W, mut rx: mpsc::Receiver<String>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        while let Some(line) = rx.recv().await {
            trace!("slot {} -> {}", slot, line);

            if let Err(e) = writer.write_all(line.as_bytes()).await {
                error!("slot {}: failed to write to modem: {}", slot, e);
                break;
            }
            if let Err(e) = writer.write_all(b"\n").await {
                error!("slot {}: failed to write newline: {}", slot, e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("slot {}: failed to flush modem channel: {}", slot, e);
                break;
            }
        }

        debug!("Modem writer for slot {} finished", slot);
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Sender bound to this connection's pending requests
    pub fn command_sender(&self, timeout: Duration) -> CommandSender {
        CommandSender::new(self.line_tx.clone(), self.pending.clone()).with_timeout(timeout)
    }

    pub fn is_running(&self) -> bool {
        !self.reader_handle.is_finished() && !self.writer_handle.is_finished()
    }

    /// Stop both tasks and fail anything still pending
    pub async fn shutdown(self) {
        self.pending.fail_all("Request cancelled").await;
        self.reader_handle.abort();
        self.writer_handle.abort();
        debug!("Modem connection for slot {} shut down", self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ModemCommand;
    use simsub_core::RefreshKind;

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (ind_tx, _ind_rx) = mpsc::channel(8);

        let conn = ModemConnection::spawn(0, client_read, client_write, ind_tx);
        assert_eq!(conn.slot(), 0);
        let sender = conn.command_sender(Duration::from_secs(1));

        // Answer every request with mode 9
        tokio::spawn(async move {
            let (server_read, mut server_write) = tokio::io::split(server);
            let mut lines = BufReader::new(server_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let req: serde_json::Value = serde_json::from_str(&line).unwrap();
                let reply = format!("{{\"id\":{},\"result\":[9]}}\n", req["id"]);
                server_write.write_all(reply.as_bytes()).await.unwrap();
            }
        });

        let response = sender
            .send(ModemCommand::GetPreferredNetworkType { slot: 0 })
            .await
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(response.int_value(), Some(9));
        assert!(conn.is_running());

        conn.shutdown().await;
    }

    #[tokio::test]
    async fn test_indication_routed() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (ind_tx, mut ind_rx) = mpsc::channel(8);

        let _conn = ModemConnection::spawn(1, client_read, client_write, ind_tx);

        let (_server_read, mut server_write) = tokio::io::split(server);
        server_write
            .write_all(b"{\"event\":\"iccRefresh\",\"params\":{\"slot\":1,\"result\":\"init\"}}\n")
            .await
            .unwrap();

        let indication = ind_rx.recv().await.unwrap();
        assert_eq!(
            indication,
            ModemIndication::IccRefresh {
                slot: 1,
                result: RefreshKind::Init
            }
        );
    }

    #[tokio::test]
    async fn test_closed_transport_cancels_pending() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (ind_tx, _ind_rx) = mpsc::channel(8);

        let conn = ModemConnection::spawn(0, client_read, client_write, ind_tx);
        let sender = conn.command_sender(Duration::from_secs(5));

        // Drop the modem side once the request arrives
        tokio::spawn(async move {
            let (server_read, _server_write) = tokio::io::split(server);
            let mut lines = BufReader::new(server_read).lines();
            let _ = lines.next_line().await;
        });

        let response = sender
            .send(ModemCommand::GetPreferredNetworkType { slot: 0 })
            .await
            .unwrap();
        assert!(!response.is_ok());
    }
}
