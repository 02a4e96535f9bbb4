mod common;

use common::{Harness, MODE};
use pretty_assertions::assert_eq;
use sysmode_core::api::{Activation, ModeCatalog, State, SystemMode};

const DO: SystemMode = SystemMode::DeviceOptimize;

#[tokio::test]
async fn request_then_get_returns_requested_state_for_every_pair() {
    let h = Harness::new();
    for d in ModeCatalog::descriptors() {
        for entry in d.states {
            h.manager.request_state(d.mode, entry.state).await.unwrap();
            assert_eq!(h.manager.get_state(d.mode).await.unwrap(), entry.state);
        }
    }
}

#[tokio::test]
async fn video_then_game_then_late_client_gets_one_catch_up() {
    let h = Harness::new();
    h.manager.request_state(DO, State::Video).await.unwrap();
    assert_eq!(h.manager.get_state(DO).await.unwrap(), State::Video);

    h.manager.request_state(DO, State::Game).await.unwrap();
    assert_eq!(h.manager.get_state(DO).await.unwrap(), State::Game);

    let plugin_a = h.listener("pluginA");
    let outcome = h.manager.client_activated("pluginA", MODE).await.unwrap();
    assert_eq!(
        outcome,
        Activation::Registered {
            replaced: false,
            caught_up: Some(State::Game),
        }
    );
    assert_eq!(plugin_a.calls(), vec!["GAME".to_string()]);
}

#[tokio::test]
async fn client_activated_before_any_request_gets_no_catch_up() {
    let h = Harness::new();
    let early = h.listener("early");
    let outcome = h.manager.client_activated("early", MODE).await.unwrap();
    assert_eq!(
        outcome,
        Activation::Registered {
            replaced: false,
            caught_up: None,
        }
    );
    assert!(early.calls().is_empty());

    h.manager.request_state(DO, State::Game).await.unwrap();
    assert_eq!(early.calls(), vec!["GAME".to_string()]);
}

#[tokio::test]
async fn second_activation_replaces_entry_and_catches_up_once() {
    let h = Harness::new();
    h.manager.request_state(DO, State::Video).await.unwrap();

    let first = h.listener("dup");
    h.manager.client_activated("dup", MODE).await.unwrap();
    assert_eq!(first.calls(), vec!["VIDEO".to_string()]);

    let second = h.listener("dup");
    let outcome = h.manager.client_activated("dup", MODE).await.unwrap();
    assert_eq!(
        outcome,
        Activation::Registered {
            replaced: true,
            caught_up: Some(State::Video),
        }
    );
    assert_eq!(second.calls(), vec!["VIDEO".to_string()]);
    assert_eq!(h.manager.registered_clients(DO), vec!["dup".to_string()]);

    // only the replacement handle is notified now
    h.manager.request_state(DO, State::Game).await.unwrap();
    assert_eq!(first.calls(), vec!["VIDEO".to_string()]);
    assert_eq!(second.calls(), vec!["VIDEO".to_string(), "GAME".to_string()]);
}

#[tokio::test]
async fn deactivating_unknown_client_is_success_and_changes_nothing() {
    let h = Harness::new();
    h.listener("A");
    h.manager.client_activated("A", MODE).await.unwrap();

    assert!(!h.manager.client_deactivated("never", MODE).await.unwrap());
    assert_eq!(h.manager.registered_clients(DO), vec!["A".to_string()]);
}

#[tokio::test]
async fn deactivated_client_stops_receiving_broadcasts() {
    let h = Harness::new();
    let a = h.listener("A");
    let b = h.listener("B");
    h.manager.client_activated("A", MODE).await.unwrap();
    h.manager.client_activated("B", MODE).await.unwrap();

    let report = h.manager.request_state(DO, State::Video).await.unwrap();
    assert_eq!(report.attempted(), 2);
    assert_eq!(a.calls(), vec!["VIDEO".to_string()]);
    assert_eq!(b.calls(), vec!["VIDEO".to_string()]);

    assert!(h.manager.client_deactivated("A", MODE).await.unwrap());
    h.manager.request_state(DO, State::Game).await.unwrap();
    assert_eq!(a.calls(), vec!["VIDEO".to_string()]);
    assert_eq!(b.calls(), vec!["VIDEO".to_string(), "GAME".to_string()]);
}

#[tokio::test]
async fn invalid_requests_leave_persisted_state_alone() {
    let h = Harness::new();
    h.manager.request_state(DO, State::Game).await.unwrap();
    let before = h.store.snapshot();

    assert!(h
        .manager
        .request_state_by_name("DEVICE_OPT", "Video")
        .await
        .unwrap_err()
        .is_invalid_argument());
    assert!(h
        .manager
        .request_state_by_name("device_optimize", "vid")
        .await
        .unwrap_err()
        .is_invalid_argument());
    assert!(h
        .manager
        .get_state_by_name("device_opt")
        .await
        .unwrap_err()
        .is_invalid_argument());

    assert_eq!(h.store.snapshot(), before);
    assert_eq!(h.manager.get_state(DO).await.unwrap(), State::Game);
}
