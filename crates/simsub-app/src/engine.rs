//! Engine - the subscription activation coordinator
//!
//! The Engine owns the coordinator state, the message channel every modem
//! completion and indication flows through, the shutdown signal and the
//! event broadcaster. It is the single entry point for the operations the
//! rest of the telephony stack drives: activation, SIM refresh, ICC event
//! gating and network mode reconciliation.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use simsub_core::prelude::*;
use simsub_core::{ModemIndication, RefreshKind, SimPresence, SlotId, SlotStatus};
use simsub_modem::ModemBinding;

use crate::actions::ActionContext;
use crate::config::Settings;
use crate::engine_event::EngineEvent;
use crate::handler;
use crate::message::Message;
use crate::process;
use crate::services::Services;
use crate::signals;
use crate::state::AppState;

/// Lightweight snapshot of state for change detection.
///
/// Captured before message processing, compared after to detect
/// what changed and emit appropriate EngineEvents.
#[derive(Debug, Clone, PartialEq)]
struct StateSnapshot {
    statuses: Vec<SlotStatus>,
}

impl StateSnapshot {
    fn capture(state: &AppState) -> Self {
        Self {
            statuses: state.slots.statuses(),
        }
    }
}

/// Subscription activation coordinator for every SIM slot.
///
/// Only one Engine can own a [`ModemBinding`]; a second `Engine::new` on the
/// same binding fails with [`Error::AlreadyInitialized`].
pub struct Engine {
    /// Coordinator state (the Model)
    pub state: AppState,

    /// Sender half of the message channel.
    /// Clone this to give to input sources (signal handler, indication bridge).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Sender for the shutdown signal. Send `true` to initiate shutdown.
    pub shutdown_tx: watch::Sender<bool>,

    /// Receiver for the shutdown signal. Clone for background tasks.
    pub shutdown_rx: watch::Receiver<bool>,

    /// Settings the engine was created with
    pub settings: Settings,

    binding: ModemBinding,

    action_ctx: ActionContext,

    /// Event broadcaster for external consumers
    event_tx: broadcast::Sender<EngineEvent>,

    indication_task: Option<JoinHandle<()>>,

    signal_task: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create the coordinator.
    ///
    /// - Validates settings
    /// - Checks the binding serves exactly the configured number of slots
    /// - Claims the binding
    /// - Creates message (capacity 256), shutdown and event (capacity 256) channels
    /// - Spawns the signal handler
    pub fn new(settings: Settings, services: Services, binding: ModemBinding) -> Result<Self> {
        settings.validate()?;

        if binding.slot_count() != settings.device.slots {
            return Err(Error::SlotCountMismatch {
                expected: settings.device.slots,
                actual: binding.slot_count(),
            });
        }

        binding.claim()?;

        let state = AppState::new(&settings, services.clone());

        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        let signal_task = signals::spawn_signal_handler(msg_tx.clone(), shutdown_rx.clone());

        let action_ctx = ActionContext {
            msg_tx: msg_tx.clone(),
            binding: binding.clone(),
            user_prefs: services.user_prefs.clone(),
            event_tx: event_tx.clone(),
        };

        info!(
            "Subscription coordinator created for {} slots",
            settings.device.slots
        );

        Ok(Self {
            state,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            settings,
            binding,
            action_ctx,
            event_tx,
            indication_task: None,
            signal_task: Some(signal_task),
        })
    }

    /// Subscribe to engine events.
    ///
    /// Multiple subscribers are supported. A subscriber that falls behind
    /// loses the oldest events (`RecvError::Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Process a single message through the TEA update cycle and emit
    /// events for the slot status changes it caused.
    pub fn process_message(&mut self, msg: Message) {
        let pre = StateSnapshot::capture(&self.state);

        process::process_message(&mut self.state, msg, &self.action_ctx);

        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Process incoming messages until none arrives for `quiet`.
    ///
    /// Returns the number of messages processed.
    pub async fn settle(&mut self, quiet: Duration) -> usize {
        let mut count = 0;
        while let Ok(Some(msg)) = tokio::time::timeout(quiet, self.msg_rx.recv()).await {
            self.process_message(msg);
            count += 1;
            if self.state.should_quit() {
                break;
            }
        }
        count
    }

    /// Run the event loop until shutdown is requested.
    pub async fn run(&mut self) {
        let mut shutdown_rx = self.shutdown_rx.clone();

        while !self.state.should_quit() {
            tokio::select! {
                msg = self.msg_rx.recv() => match msg {
                    Some(msg) => self.process_message(msg),
                    None => break,
                },
                _ = shutdown_rx.changed() => break,
            }
        }

        debug!("Coordinator event loop stopped");
    }

    // ─────────────────────────────────────────────────────────
    // Subscription Activation
    // ─────────────────────────────────────────────────────────

    /// Drive every slot toward the state its SIM presence asks for.
    ///
    /// `sim_status` must carry one entry per slot. `stack_ready` forces a
    /// set-uicc for every present card, even when the cached status
    /// already matches.
    pub fn update_subscription_activation(
        &mut self,
        sim_status: Vec<SimPresence>,
        stack_ready: bool,
    ) -> Result<()> {
        if sim_status.len() != self.state.slot_count() {
            return Err(Error::SlotCountMismatch {
                expected: self.state.slot_count(),
                actual: sim_status.len(),
            });
        }

        self.process_message(Message::UpdateSubActivation {
            sim_status,
            stack_ready,
        });
        Ok(())
    }

    /// Card refresh reported for `slot`
    pub fn on_sim_refresh(&mut self, slot: SlotId, kind: RefreshKind) -> Result<()> {
        self.check_slot(slot)?;
        self.process_message(Message::IccRefresh { slot, kind });
        Ok(())
    }

    /// Whether `slot` must be activated again after a refresh
    pub fn needs_activation_after_refresh(&self, slot: SlotId) -> bool {
        self.state.needs_activation_after_refresh(slot)
    }

    /// Decide whether an ICC status event for `slot` should be processed.
    ///
    /// May reset the slot to `Uninitialized` when its radio turned off
    /// outside airplane mode.
    pub fn should_process_icc_event(&mut self, slot: SlotId) -> Result<bool> {
        self.check_slot(slot)?;

        let pre = StateSnapshot::capture(&self.state);
        let process = handler::should_process_icc_event(&mut self.state, slot);
        let post = StateSnapshot::capture(&self.state);
        self.emit_events(&pre, &post);

        Ok(process)
    }

    /// Every slot has left `Uninitialized`
    pub fn all_subscriptions_available(&self) -> bool {
        self.state.all_subs_available()
    }

    pub fn slot_status(&self, slot: SlotId) -> Option<SlotStatus> {
        self.state.slots.status(slot)
    }

    // ─────────────────────────────────────────────────────────
    // Network Mode
    // ─────────────────────────────────────────────────────────

    /// Seed subscription table modes still at the factory default
    pub fn reconcile_network_modes_on_boot(&mut self) {
        self.process_message(Message::ReconcileOnBoot);
    }

    /// Overwrite every subscription's mode with the setting for its slot
    pub fn reconcile_network_modes_on_demand(&mut self) {
        handler::reconcile_on_demand(&mut self.state);
    }

    /// The preferred network mode setting changed
    pub fn on_network_mode_setting_changed(&mut self) {
        self.process_message(Message::NetworkModeSettingChanged);
    }

    /// Push subscription modes to the modem when they differ from settings
    pub fn update_network_mode(&mut self) {
        self.process_message(Message::UpdateNetworkMode);
    }

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────

    /// Forward modem indications into the message channel.
    ///
    /// Only the first call gets the indication stream; later calls are no-ops.
    pub fn spawn_indication_bridge(&mut self) {
        if self.indication_task.is_some() {
            return;
        }
        let Some(mut indications) = self.binding.take_indications() else {
            warn!("Modem indications already taken");
            return;
        };

        let msg_tx = self.msg_tx.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();

        self.indication_task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    indication = indications.recv() => {
                        let Some(indication) = indication else {
                            break;
                        };
                        let msg = match indication {
                            ModemIndication::IccRefresh { slot, result } => {
                                Message::IccRefresh { slot, kind: result }
                            }
                        };
                        if msg_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            trace!("Indication bridge stopped");
        }));
    }

    /// Initiate shutdown: signal background tasks and fail outstanding
    /// modem requests.
    pub async fn shutdown(&mut self) {
        self.emit(EngineEvent::Shutdown);

        let _ = self.shutdown_tx.send(true);

        self.binding.cancel_pending().await;

        if let Some(task) = self.indication_task.take() {
            if tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .is_err()
            {
                warn!("Indication bridge did not stop in time");
            }
        }

        if let Some(task) = self.signal_task.take() {
            let _ = tokio::time::timeout(Duration::from_millis(500), task).await;
        }
    }

    fn check_slot(&self, slot: SlotId) -> Result<()> {
        if slot >= self.state.slot_count() {
            return Err(Error::invalid_slot(slot, self.state.slot_count()));
        }
        Ok(())
    }

    /// Emit EngineEvents for every slot whose status changed.
    fn emit_events(&self, pre: &StateSnapshot, post: &StateSnapshot) {
        for (slot, (old, new)) in pre.statuses.iter().zip(&post.statuses).enumerate() {
            if old != new {
                self.emit(EngineEvent::SlotStatusChanged {
                    slot,
                    old_status: *old,
                    new_status: *new,
                });
            }
        }
    }

    /// send() returns Err only if there are no receivers; that's fine.
    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}
