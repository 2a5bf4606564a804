//! Behavioural tests for SecureSlot against instrumented stores.

use std::sync::Arc;
use std::time::Duration;

use keychain_property::{SecureSlot, SlotConfig, SlotError, TryRecvError};
use keychain_property_integration_tests::InstrumentedStore;
use keychain_property_store::{AccessPolicy, ItemKey, SecureStore};
use serde::{Deserialize, Serialize};

const SERVICE: &str = "com.example.app";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    user: String,
    pin: u32,
}

fn account(user: &str, pin: u32) -> Account {
    Account {
        user: user.to_string(),
        pin,
    }
}

fn config(key: &str) -> SlotConfig {
    SlotConfig::new(key).with_service(SERVICE)
}

fn item(key: &str) -> ItemKey {
    ItemKey::new(SERVICE, key).unwrap()
}

#[test]
fn test_write_then_read_round_trips() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> = SecureSlot::open(config("account"), store.clone()).unwrap();

    for value in [account("alice", 1234), account("bob", 0), account("", u32::MAX)] {
        slot.set(Some(value.clone()));
        assert_eq!(slot.get(), Some(value));
    }
}

#[test]
fn test_write_absent_deletes_entry() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> = SecureSlot::open(config("account"), store.clone()).unwrap();

    slot.set(Some(account("alice", 1)));
    assert!(store.raw().contains(&item("account")).unwrap());

    slot.set(None);
    assert_eq!(slot.get(), None);
    assert!(!store.raw().contains(&item("account")).unwrap());
    assert_eq!(store.deletes(), 1);
}

#[test]
fn test_biometry_cache_bypasses_store_after_read() {
    let store = Arc::new(InstrumentedStore::new());
    store
        .raw()
        .set(
            &item("account"),
            &serde_json::to_vec(&account("alice", 7)).unwrap(),
            &AccessPolicy::biometry_current_set(),
        )
        .unwrap();

    let slot: SecureSlot<Account> = SecureSlot::open(
        config("account").requiring_biometry(true).caching(true),
        store.clone(),
    )
    .unwrap();

    store.allow_gets(1);
    assert_eq!(slot.get(), Some(account("alice", 7)));
    for _ in 0..5 {
        assert_eq!(slot.get(), Some(account("alice", 7)));
    }
    assert_eq!(store.gets(), 1);
}

#[test]
fn test_biometry_cache_bypasses_store_after_write() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> = SecureSlot::open(
        config("account").requiring_biometry(true).caching(true),
        store.clone(),
    )
    .unwrap();

    slot.set(Some(account("bob", 9)));
    store.allow_gets(0);
    assert_eq!(slot.get(), Some(account("bob", 9)));
    assert_eq!(store.gets(), 0);
}

#[test]
fn test_biometry_without_cache_always_fetches() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> =
        SecureSlot::open(config("account").requiring_biometry(true), store.clone()).unwrap();

    slot.set(Some(account("bob", 9)));
    slot.get();
    slot.get();
    assert_eq!(store.gets(), 2);
}

#[test]
fn test_non_biometry_cache_still_reads_store() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> =
        SecureSlot::open(config("account").caching(true), store.clone()).unwrap();
    let after_open = store.gets();

    slot.set(Some(account("carol", 3)));
    slot.get();
    slot.get();
    assert_eq!(store.gets(), after_open + 2);
}

#[test]
fn test_denied_authentication_reads_as_absent() {
    let store = Arc::new(InstrumentedStore::new());
    store
        .raw()
        .set(
            &item("account"),
            &serde_json::to_vec(&account("alice", 7)).unwrap(),
            &AccessPolicy::biometry_current_set(),
        )
        .unwrap();

    let slot: SecureSlot<Account> = SecureSlot::open(
        config("account").requiring_biometry(true).caching(true),
        store.clone(),
    )
    .unwrap();

    store.deny_authentication(true);
    assert_eq!(slot.get(), None);
    assert!(slot.try_get().is_err());

    // A later successful prompt is served normally and then cached.
    store.deny_authentication(false);
    assert_eq!(slot.get(), Some(account("alice", 7)));
    store.allow_gets(store.gets());
    assert_eq!(slot.get(), Some(account("alice", 7)));
}

#[test]
fn test_replay_subscriber_receives_last_write_first() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> =
        SecureSlot::open(config("account").caching(true), store).unwrap();

    slot.set(Some(account("alice", 1)));
    slot.set(Some(account("alice", 2)));

    let mut sub = slot.subscribe();
    assert_eq!(sub.try_recv(), Ok(Some(account("alice", 2))));
    assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));

    slot.set(None);
    assert_eq!(sub.try_recv(), Ok(None));
}

#[test]
fn test_live_subscriber_receives_nothing_until_next_write() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> = SecureSlot::open(config("account"), store).unwrap();

    slot.set(Some(account("alice", 1)));
    let mut sub = slot.subscribe();
    assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));

    slot.set(Some(account("alice", 2)));
    assert_eq!(sub.try_recv(), Ok(Some(account("alice", 2))));
}

#[test]
fn test_construction_seeds_replay_channel() {
    let store = Arc::new(InstrumentedStore::new());
    store
        .raw()
        .set(
            &item("account"),
            &serde_json::to_vec(&account("seeded", 42)).unwrap(),
            &AccessPolicy::device_passcode(),
        )
        .unwrap();

    let slot: SecureSlot<Account> =
        SecureSlot::open(config("account").caching(true), store.clone()).unwrap();
    assert_eq!(store.gets(), 1);

    store.trap_all();
    let mut sub = slot.subscribe();
    assert_eq!(sub.try_recv(), Ok(Some(account("seeded", 42))));
    assert_eq!(slot.cached(), Some(account("seeded", 42)));
}

#[test]
fn test_construction_without_cache_does_not_read() {
    let store = Arc::new(InstrumentedStore::new());
    store.trap_all();
    let _slot: SecureSlot<Account> = SecureSlot::open(config("account"), store.clone()).unwrap();
    assert_eq!(store.total_calls(), 0);
}

#[test]
fn test_biometry_construction_never_touches_store() {
    let store = Arc::new(InstrumentedStore::new());
    store
        .raw()
        .set(
            &item("account"),
            &serde_json::to_vec(&account("alice", 7)).unwrap(),
            &AccessPolicy::biometry_current_set(),
        )
        .unwrap();

    store.trap_all();
    let slot: SecureSlot<Account> = SecureSlot::open(
        config("account").requiring_biometry(true).caching(true),
        store.clone(),
    )
    .unwrap();
    assert_eq!(store.total_calls(), 0);

    // Nothing was seeded, so a replay subscriber starts from absence.
    let mut sub = slot.subscribe();
    assert_eq!(sub.try_recv(), Ok(None));

    store.disarm();
    assert_eq!(slot.get(), Some(account("alice", 7)));
}

#[test]
fn test_corrupt_data_reads_as_absent() {
    let store = Arc::new(InstrumentedStore::new());
    store
        .raw()
        .set(
            &item("account"),
            b"\x00\x01 definitely not json",
            &AccessPolicy::device_passcode(),
        )
        .unwrap();

    let slot: SecureSlot<Account> = SecureSlot::open(config("account"), store.clone()).unwrap();
    assert_eq!(slot.get(), None);

    // Schema mismatch is treated the same way.
    store
        .raw()
        .set(
            &item("account"),
            br#"{"user": 12}"#,
            &AccessPolicy::device_passcode(),
        )
        .unwrap();
    assert_eq!(slot.get(), None);
}

#[test]
fn test_independent_keys_under_one_service() {
    let store: Arc<dyn SecureStore> = Arc::new(InstrumentedStore::new());
    let first: SecureSlot<Account> =
        SecureSlot::open(config("first").caching(true), store.clone()).unwrap();
    let second: SecureSlot<Account> =
        SecureSlot::open(config("second").caching(true), store).unwrap();
    let mut second_sub = second.subscribe();
    assert_eq!(second_sub.try_recv(), Ok(None));

    first.set(Some(account("alice", 1)));
    assert_eq!(second.get(), None);
    assert_eq!(second_sub.try_recv(), Err(TryRecvError::Empty));

    second.set(Some(account("bob", 2)));
    assert_eq!(first.get(), Some(account("alice", 1)));
    assert_eq!(second.get(), Some(account("bob", 2)));

    second.clear();
    assert_eq!(first.get(), Some(account("alice", 1)));
}

#[test]
fn test_failed_persist_still_publishes() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<Account> =
        SecureSlot::open(config("account").caching(true), store.clone()).unwrap();
    let mut sub = slot.subscribe();
    assert_eq!(sub.try_recv(), Ok(None));

    store.fail_writes(true);
    slot.set(Some(account("ghost", 0)));
    assert_eq!(sub.try_recv(), Ok(Some(account("ghost", 0))));

    // The store never accepted it.
    assert!(!store.raw().contains(&item("account")).unwrap());
}

#[test]
fn test_unencodable_value_clears_entry_and_publishes() {
    use std::collections::HashMap;

    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<HashMap<Vec<u8>, u32>> =
        SecureSlot::open(config("map").caching(true), store.clone()).unwrap();

    let mut good = HashMap::new();
    good.insert(Vec::new(), 1);
    // JSON object keys must be strings, so this cannot encode.
    slot.set(Some(good.clone()));

    assert_eq!(store.sets(), 0);
    assert_eq!(store.deletes(), 1);
    assert_eq!(slot.cached(), Some(good));
}

#[test]
fn test_unencodable_value_reports_stale_entry_when_delete_fails() {
    use std::collections::HashMap;

    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<HashMap<Vec<u8>, u32>> =
        SecureSlot::open(config("map").caching(true), store.clone()).unwrap();

    let mut old = HashMap::new();
    old.insert(b"k".to_vec(), 1);
    store
        .raw()
        .set(&item("map"), br#"{"stale":1}"#, &AccessPolicy::device_passcode())
        .unwrap();

    store.fail_writes(true);
    let result = slot.try_set(Some(old.clone()));

    assert!(
        matches!(result, Err(SlotError::StaleEntry { .. })),
        "got {result:?}"
    );
    assert_eq!(store.deletes(), 1);
    assert!(store.raw().contains(&item("map")).unwrap());
    assert_eq!(slot.cached(), Some(old));
}

#[test]
fn test_free_form_keys_round_trip() {
    let store = Arc::new(InstrumentedStore::new());
    for key in ["user@example.com", "auth token", "oauth/refresh", "clé secrète"] {
        let slot: SecureSlot<Account> = SecureSlot::open(config(key), store.clone()).unwrap();
        slot.set(Some(account(key, 7)));
        assert_eq!(slot.get(), Some(account(key, 7)));
        assert!(store.raw().contains(&item(key)).unwrap());
    }
    assert_eq!(store.raw().len(), 4);
}

#[tokio::test]
async fn test_async_subscriber_sees_every_write() {
    let store = Arc::new(InstrumentedStore::new());
    let slot: Arc<SecureSlot<u32>> = Arc::new(SecureSlot::open(config("counter"), store).unwrap());
    let mut sub = slot.subscribe();

    let writer = slot.clone();
    let handle = tokio::spawn(async move {
        for i in 0..5 {
            writer.set(Some(i));
        }
        writer.set(None);
    });

    let mut seen = Vec::new();
    for _ in 0..6 {
        let value = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("timed out waiting for value");
        seen.push(value.expect("slot dropped"));
    }
    handle.await.unwrap();

    assert_eq!(seen, vec![Some(0), Some(1), Some(2), Some(3), Some(4), None]);
}

#[tokio::test]
async fn test_stream_ends_when_slot_dropped() {
    use futures::StreamExt;

    let store = Arc::new(InstrumentedStore::new());
    let slot: SecureSlot<String> =
        SecureSlot::open(config("token").caching(true), store).unwrap();
    slot.set(Some("a".to_string()));

    let stream = slot.subscribe().into_stream();
    slot.set(Some("b".to_string()));
    drop(slot);

    let values: Vec<Option<String>> = stream.collect().await;
    assert_eq!(values, vec![Some("a".to_string()), Some("b".to_string())]);
}
