//! Per-slot modem bindings shared with the coordinator
//!
//! A [`ModemBinding`] bundles one [`CommandSender`] per slot and the stream of
//! unsolicited indications. It can be claimed by exactly one coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use simsub_core::prelude::*;
use simsub_core::{ModemIndication, NetworkMode, SlotId, SubState};

use crate::commands::{CommandSender, ModemCommand};

/// Network mode policy operations the coordinator drives through the modem
#[trait_variant::make(ModemBindingPolicy: Send)]
pub trait LocalModemBindingPolicy {
    /// Push one preferred network mode per slot.
    ///
    /// Returns `Ok(false)` when any slot rejected its mode.
    async fn update_preferred_network_types(&self, modes: &[NetworkMode]) -> Result<bool>;
}

struct BindingInner {
    senders: Vec<CommandSender>,
    indications: Mutex<Option<mpsc::Receiver<ModemIndication>>>,
    claimed: AtomicBool,
}

/// Handle to the modem channels of every slot
#[derive(Clone)]
pub struct ModemBinding {
    inner: Arc<BindingInner>,
}

impl std::fmt::Debug for ModemBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemBinding")
            .field("slots", &self.inner.senders.len())
            .field("claimed", &self.is_claimed())
            .finish()
    }
}

impl ModemBinding {
    pub fn new(senders: Vec<CommandSender>, indications: mpsc::Receiver<ModemIndication>) -> Self {
        Self {
            inner: Arc::new(BindingInner {
                senders,
                indications: Mutex::new(Some(indications)),
                claimed: AtomicBool::new(false),
            }),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.inner.senders.len()
    }

    /// Mark the binding as owned by a coordinator.
    ///
    /// Fails with [`Error::AlreadyInitialized`] on every call after the first.
    pub fn claim(&self) -> Result<()> {
        if self.inner.claimed.swap(true, Ordering::SeqCst) {
            warn!("Modem binding claimed twice");
            return Err(Error::AlreadyInitialized);
        }
        Ok(())
    }

    pub fn is_claimed(&self) -> bool {
        self.inner.claimed.load(Ordering::SeqCst)
    }

    /// Take the indication stream; only the first caller gets it
    pub fn take_indications(&self) -> Option<mpsc::Receiver<ModemIndication>> {
        match self.inner.indications.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn sender(&self, slot: SlotId) -> Result<&CommandSender> {
        self.inner
            .senders
            .get(slot)
            .ok_or_else(|| Error::invalid_slot(slot, self.slot_count()))
    }

    /// Activate or deactivate one card application.
    ///
    /// `Ok(false)` means the modem answered with an error.
    pub async fn set_uicc_subscription(
        &self,
        slot: SlotId,
        app_index: usize,
        state: SubState,
    ) -> Result<bool> {
        let response = self
            .sender(slot)?
            .send(ModemCommand::SetUiccSubscription {
                slot,
                app_index,
                state,
            })
            .await?;

        if let Some(err) = response.error() {
            warn!("set uicc slot={} app={} {} failed: {}", slot, app_index, state, err);
        }
        Ok(response.is_ok())
    }

    /// Query the mode the modem currently uses.
    ///
    /// `Ok(None)` means the modem answered with an error or no integer.
    pub async fn get_preferred_network_type(&self, slot: SlotId) -> Result<Option<NetworkMode>> {
        let response = self
            .sender(slot)?
            .send(ModemCommand::GetPreferredNetworkType { slot })
            .await?;

        Ok(response.int_value().map(NetworkMode))
    }

    pub async fn set_preferred_network_type(&self, slot: SlotId, mode: NetworkMode) -> Result<bool> {
        let response = self
            .sender(slot)?
            .send(ModemCommand::SetPreferredNetworkType { slot, mode })
            .await?;
        Ok(response.is_ok())
    }

    /// Fail every outstanding request on every slot
    pub async fn cancel_pending(&self) {
        for sender in &self.inner.senders {
            sender.pending().fail_all("Request cancelled").await;
        }
    }
}

impl ModemBindingPolicy for ModemBinding {
    async fn update_preferred_network_types(&self, modes: &[NetworkMode]) -> Result<bool> {
        if modes.len() != self.slot_count() {
            return Err(Error::SlotCountMismatch {
                expected: self.slot_count(),
                actual: modes.len(),
            });
        }

        let mut all_accepted = true;
        for (slot, mode) in modes.iter().enumerate() {
            if !self.set_preferred_network_type(slot, *mode).await? {
                warn!("slot {} rejected network mode {}", slot, mode);
                all_accepted = false;
            }
        }
        Ok(all_accepted)
    }
}
