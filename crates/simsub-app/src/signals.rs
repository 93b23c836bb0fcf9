//! Termination signals turned into `Message::Shutdown`

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use simsub_core::prelude::*;

use crate::message::Message;

/// Which signal asked the daemon to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

/// Forward the first termination signal to the engine.
///
/// The task also exits quietly once the engine starts shutting down on its
/// own, so it never outlives the engine.
pub fn spawn_signal_handler(
    tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            received = wait_for_termination() => match received {
                Ok(signal) => {
                    info!("{:?} received, shutting down", signal);
                    let _ = tx.send(Message::Shutdown).await;
                }
                Err(e) => error!("Cannot install signal handlers: {}", e),
            },
            _ = shutdown_rx.changed() => {
                debug!("Signal handler stopped by engine shutdown");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_termination() -> Result<TerminationSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let received = tokio::select! {
        _ = interrupt.recv() => TerminationSignal::Interrupt,
        _ = terminate.recv() => TerminationSignal::Terminate,
    };
    Ok(received)
}

#[cfg(not(unix))]
async fn wait_for_termination() -> Result<TerminationSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(TerminationSignal::Interrupt)
}
