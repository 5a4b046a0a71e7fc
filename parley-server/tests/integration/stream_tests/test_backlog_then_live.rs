use futures::StreamExt;
use parley_core::Role;
use std::time::Duration;
use tokio::time::timeout;

use crate::utils::{WAIT_TIMEOUT_MS, client, init_tracing, memory_store, room, test_rooms};

#[tokio::test]
async fn test_late_subscriber_gets_backlog_then_live() {
    init_tracing();

    let rooms = test_rooms(memory_store());
    let r1 = room("r1");
    rooms.join(&r1, client("A")).await.unwrap();
    rooms.join(&r1, client("B")).await.unwrap();
    let state = rooms.room(r1);

    state.post_candidate(&client("A"), Role::Offerer, "A").await.unwrap();
    state.post_candidate(&client("A"), Role::Offerer, "B").await.unwrap();

    let mut to_answerer = state.stream_candidates(Role::Answerer).await.unwrap();
    state.post_candidate(&client("A"), Role::Offerer, "C").await.unwrap();

    let received: Vec<String> = timeout(
        Duration::from_millis(WAIT_TIMEOUT_MS),
        to_answerer.by_ref().take(3).collect(),
    )
    .await
    .expect("candidates not delivered");
    assert_eq!(received, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_each_subscriber_gets_its_own_copy() {
    init_tracing();

    let rooms = test_rooms(memory_store());
    let r1 = room("r1");
    rooms.join(&r1, client("A")).await.unwrap();
    rooms.join(&r1, client("B")).await.unwrap();
    let state = rooms.room(r1);

    state.post_candidate(&client("B"), Role::Answerer, "old").await.unwrap();
    let mut first = state.stream_candidates(Role::Offerer).await.unwrap();
    let mut second = state.stream_candidates(Role::Offerer).await.unwrap();
    state.post_candidate(&client("B"), Role::Answerer, "new").await.unwrap();

    for stream in [&mut first, &mut second] {
        let received: Vec<String> = timeout(
            Duration::from_millis(WAIT_TIMEOUT_MS),
            stream.take(2).collect(),
        )
        .await
        .expect("candidates not delivered");
        assert_eq!(received, vec!["old", "new"]);
    }
}
