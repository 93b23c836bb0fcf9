//! Engine integration tests against the simulated modem
//!
//! Run with: cargo test --test engine_integration

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_test::assert_ok;

use simsub_app::services::memory::SubscriptionRecord;
use simsub_app::{Engine, EngineEvent, MemoryServices, Settings, SettingsStore};
use simsub_core::{
    AppFamily, AppType, NetworkMode, Outcome, RefreshKind, SimPresence, SlotStatus, SubState,
};
use simsub_modem::test_utils::{test_modem, test_modem_with};
use simsub_modem::SimulatedSlot;

const QUIET: Duration = Duration::from_millis(150);
const LTE_GLOBAL: NetworkMode = NetworkMode(9);

fn settings(slots: usize) -> Settings {
    let mut settings = Settings::default();
    settings.device.slots = slots;
    settings
}

fn drain_events(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn set_uicc_outcomes(events: &[EngineEvent]) -> Vec<(usize, Outcome)> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::SetUiccResult { slot, outcome, .. } => Some((*slot, *outcome)),
            _ => None,
        })
        .collect()
}

fn prefs_events(events: &[EngineEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::UserPrefsUpdated { trigger_dds } => Some(*trigger_dds),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_stack_ready_round_with_partial_failure() {
    // Slot 0 carries only a USIM whose activation is rejected
    let slot0 = SimulatedSlot::default()
        .with_apps(vec![AppType::Usim])
        .failing(AppFamily::ThreeGpp);
    let (binding, modem) = test_modem_with(vec![slot0, SimulatedSlot::default()]);

    let stores = MemoryServices::provisioned(2, LTE_GLOBAL);
    stores.cards.insert_card(0, vec![AppType::Usim]);
    let mut engine = assert_ok!(Engine::new(settings(2), stores.services(), binding));
    let mut rx = engine.subscribe();

    assert_ok!(engine.update_subscription_activation(vec![SimPresence::Present; 2], true));
    engine.settle(QUIET).await;

    let events = drain_events(&mut rx);
    let mut outcomes = set_uicc_outcomes(&events);
    outcomes.sort_by_key(|(slot, _)| *slot);
    assert_eq!(outcomes, vec![(0, Outcome::Failure), (1, Outcome::Success)]);
    assert_eq!(prefs_events(&events), vec![true]);

    assert_eq!(engine.slot_status(0), Some(SlotStatus::SetFailed));
    assert_eq!(engine.slot_status(1), Some(SlotStatus::Active));
    assert!(engine.all_subscriptions_available());
    assert_eq!(stores.user_prefs.calls(), vec![true]);
    assert_eq!(modem.commands_for("uicc.setSubscription").len(), 3);

    engine.shutdown().await;
    modem.shutdown().await;
}

#[tokio::test]
async fn test_deactivation_fails_on_single_family() {
    let slot = SimulatedSlot::default().failing(AppFamily::ThreeGpp2);
    let (binding, _modem) = test_modem_with(vec![slot]);

    let stores = MemoryServices::provisioned(1, LTE_GLOBAL);
    stores
        .subscriptions
        .insert(0, SubscriptionRecord::new(1).with_state(SubState::Inactive));
    let mut engine = assert_ok!(Engine::new(settings(1), stores.services(), binding));
    let mut rx = engine.subscribe();

    assert_ok!(engine.update_subscription_activation(vec![SimPresence::Present], false));
    engine.settle(QUIET).await;

    let events = drain_events(&mut rx);
    assert_eq!(set_uicc_outcomes(&events), vec![(0, Outcome::Failure)]);
    assert_eq!(engine.slot_status(0), Some(SlotStatus::SetFailed));
    assert_eq!(stores.user_prefs.call_count(), 1);
}

#[tokio::test]
async fn test_refresh_then_reactivate() {
    let (binding, modem) = test_modem(2);
    let stores = MemoryServices::provisioned(2, LTE_GLOBAL);
    let mut engine = assert_ok!(Engine::new(settings(2), stores.services(), binding));
    engine.spawn_indication_bridge();

    assert_ok!(engine.update_subscription_activation(vec![SimPresence::Present; 2], false));
    engine.settle(QUIET).await;
    assert_eq!(stores.user_prefs.call_count(), 1);

    assert_ok!(modem.inject_refresh(0, RefreshKind::Reset).await);
    engine.settle(QUIET).await;
    assert!(engine.needs_activation_after_refresh(0));
    assert!(!engine.all_subscriptions_available());

    // Only the reset slot is sent again
    let before = modem.commands_for("uicc.setSubscription").len();
    assert_ok!(engine.update_subscription_activation(vec![SimPresence::Present; 2], false));
    engine.settle(QUIET).await;

    let resent = &modem.commands_for("uicc.setSubscription")[before..];
    assert_eq!(resent.len(), 2);
    assert!(resent.iter().all(|c| c.slot == 0));
    assert!(engine.all_subscriptions_available());
    assert_eq!(stores.user_prefs.calls(), vec![false, false]);
}

#[tokio::test]
async fn test_network_mode_sync_after_round() {
    let (binding, modem) = test_modem(2);
    let stores = MemoryServices::provisioned(2, LTE_GLOBAL);
    stores
        .subscriptions
        .insert(1, SubscriptionRecord::new(2).with_network_mode(NetworkMode(22)));
    let mut engine = assert_ok!(Engine::new(settings(2), stores.services(), binding));
    let mut rx = engine.subscribe();

    engine.reconcile_network_modes_on_boot();
    assert_ok!(engine.update_subscription_activation(vec![SimPresence::Present; 2], false));
    engine.settle(QUIET).await;

    let events = drain_events(&mut rx);
    assert!(events.contains(&EngineEvent::NetworkModePushed {
        modes: vec![LTE_GLOBAL, NetworkMode(22)],
        succeeded: true,
    }));
    assert_eq!(modem.network_mode(1), Some(NetworkMode(22)));
}

#[tokio::test]
async fn test_rejected_network_mode_reads_back_modem() {
    let slot = SimulatedSlot::default().with_network_mode(NetworkMode(3));
    let mut rejecting = slot.clone();
    rejecting.reject_network_mode = true;
    let (binding, modem) = test_modem_with(vec![rejecting, slot]);

    let stores = MemoryServices::provisioned(2, LTE_GLOBAL);
    stores
        .subscriptions
        .insert(0, SubscriptionRecord::new(1).with_network_mode(NetworkMode(22)));
    let mut engine = assert_ok!(Engine::new(settings(2), stores.services(), binding));

    engine.update_network_mode();
    engine.settle(QUIET).await;

    // Slot 0 rejected 22 and still runs 3; slot 1 accepted the settings value
    assert_eq!(modem.network_mode(0), Some(NetworkMode(3)));
    assert_eq!(stores.settings.network_mode(0), Some(NetworkMode(3)));
    assert_eq!(stores.settings.network_mode(1), Some(LTE_GLOBAL));
}
