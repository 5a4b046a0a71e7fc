use parley_core::Role;
use parley_server::RelayError;
use std::sync::Arc;

use crate::utils::{FlakyStore, client, init_tracing, room, test_rooms};

#[tokio::test]
async fn test_transient_store_failures_are_retried() {
    init_tracing();

    let store = FlakyStore::new();
    let rooms = test_rooms(Arc::new(store.clone()));

    store.fail_next(2);
    let role = rooms.join(&room("r1"), client("A")).await;

    assert_eq!(role.unwrap(), Role::Offerer);
    assert!(store.calls() > 2);
}

#[tokio::test]
async fn test_persistent_outage_surfaces_after_bounded_retries() {
    init_tracing();

    let store = FlakyStore::new();
    let rooms = test_rooms(Arc::new(store.clone()));

    store.set_down(true);
    let result = rooms.room(room("r1")).get_sdp(Role::Offerer).await;

    assert!(matches!(result, Err(RelayError::StoreUnavailable(_))));
    // One attempt plus three retries.
    assert_eq!(store.calls(), 4);
}

#[tokio::test]
async fn test_role_errors_are_not_retried() {
    init_tracing();

    let store = FlakyStore::new();
    let rooms = test_rooms(Arc::new(store.clone()));
    let before = store.calls();

    let result = rooms
        .room(room("r1"))
        .post_sdp(&client("ghost"), Role::Offerer, "v=0")
        .await;

    assert!(matches!(result, Err(RelayError::Forbidden(_))));
    // Only the role lookup ran.
    assert_eq!(store.calls() - before, 1);
}
