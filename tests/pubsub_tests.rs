// Integration tests for the pub/sub bridge over the in-process store

use gooey_gui::{ChannelStore, GuiConfig, MemoryStore, PubSub};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bridge() -> (Arc<MemoryStore>, PubSub) {
    let store = MemoryStore::shared();
    (store.clone(), PubSub::new(store))
}

#[test]
fn test_logical_name_round_trip() {
    let (store, bridge) = bridge();
    bridge.publish("x", &json!({"y": "hello"}), None).unwrap();

    assert_eq!(bridge.poll_one("x").unwrap(), Some(json!({"y": "hello"})));
    assert_ne!(bridge.wire_name("x"), "x");
    assert!(store.get("x").unwrap().is_none());
}

#[test]
fn test_logical_names_do_not_collide() {
    let (_, bridge) = bridge();
    bridge.publish("x", &1, None).unwrap();
    bridge.publish("x/y", &2, None).unwrap();
    bridge.publish("y", &3, None).unwrap();
    assert_eq!(
        bridge.poll(&["x", "x/y", "y"]).unwrap(),
        vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]
    );
}

#[test]
fn test_prefix_from_config() {
    let store = MemoryStore::shared();
    let config = GuiConfig::parse("GOOEY_CHANNEL_PREFIX=app-b/").unwrap();
    let bridge = PubSub::from_config(store.clone(), &config);
    bridge.publish("x", &true, None).unwrap();
    assert_eq!(store.get("app-b/x").unwrap().as_deref(), Some("true"));
}

#[test]
fn test_later_publish_wins() {
    let (_, bridge) = bridge();
    bridge.publish("x", &"old", None).unwrap();
    bridge.publish("x", &"new", None).unwrap();
    assert_eq!(bridge.poll_one("x").unwrap(), Some(json!("new")));
}

#[test]
fn test_subscribe_receives_publish_from_another_thread() {
    let (_, bridge) = bridge();
    let mut subscription = bridge
        .clone()
        .with_subscribe_timeout(Duration::from_millis(20))
        .subscribe("progress")
        .unwrap();

    let publisher = bridge.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        publisher
            .publish("progress", &json!({"__run_status": "running"}), None)
            .unwrap();
    });

    // several empty attempts are retried before the value arrives
    let value = subscription.next().unwrap().unwrap();
    assert_eq!(value["__run_status"], json!("running"));
    handle.join().unwrap();
}

#[test]
fn test_subscribe_single_attempt_times_out() {
    let (_, bridge) = bridge();
    let mut subscription = bridge.subscribe("quiet").unwrap();
    assert_eq!(subscription.wire_name(), "gooey-gui/state/quiet");
    assert_eq!(subscription.next_within(Duration::from_millis(10)).unwrap(), None);
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let (store, bridge) = bridge();
    let subscription = bridge.subscribe("x").unwrap();
    assert_eq!(store.listener_count("gooey-gui/state/x"), 1);
    drop(subscription);
    assert_eq!(store.listener_count("gooey-gui/state/x"), 0);
}

#[test]
fn test_outage_surfaces_to_caller() {
    let (store, bridge) = bridge();
    store.set_available(false);

    let err = bridge.publish("x", &1, None).unwrap_err();
    assert_eq!(err.code(), "STORE_UNAVAILABLE");
    assert!(bridge.poll(&["x"]).is_err());
    assert!(bridge.subscribe("x").is_err());

    store.set_available(true);
    bridge.publish("x", &1, None).unwrap();
}
