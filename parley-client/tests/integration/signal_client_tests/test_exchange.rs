use parley_client::{ClientError, SignalClient};
use parley_core::{ClientId, Role, RoomId};

use crate::utils::{RelayHarness, init_tracing};

#[tokio::test]
async fn test_roles_and_description_exchange() {
    init_tracing();
    let relay = RelayHarness::start().await.unwrap();
    let a = relay.client("r1", "A");
    let b = relay.client("r1", "B");

    assert_eq!(a.join().await.unwrap(), Role::Offerer);
    assert_eq!(b.join().await.unwrap(), Role::Answerer);
    // Rejoining keeps the role.
    assert_eq!(a.join().await.unwrap(), Role::Offerer);

    assert_eq!(b.get_sdp(Role::Offerer).await.unwrap(), None);
    a.post_sdp(Role::Offerer, "v=0 offer").await.unwrap();
    assert_eq!(
        b.get_sdp(Role::Offerer).await.unwrap().as_deref(),
        Some("v=0 offer")
    );

    b.post_sdp(Role::Answerer, "v=0 answer").await.unwrap();
    assert_eq!(
        a.get_sdp(Role::Answerer).await.unwrap().as_deref(),
        Some("v=0 answer")
    );

    relay.stop().await.unwrap();
}

#[tokio::test]
async fn test_relay_errors_are_typed() {
    init_tracing();
    let relay = RelayHarness::start().await.unwrap();
    let a = relay.client("r1", "A");
    a.join().await.unwrap();
    relay.client("r1", "B").join().await.unwrap();

    let err = relay.client("r1", "C").join().await.unwrap_err();
    assert!(matches!(err, ClientError::RoomFull(_)));
    assert!(err.is_fatal());

    // B holds the answerer role, so A cannot post an answer.
    let err = a.post_sdp(Role::Answerer, "v=0").await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));

    let err = a.post_candidate(Role::Answerer, "cand").await.unwrap_err();
    assert!(matches!(err, ClientError::Forbidden(_)));

    let err = a.post_sdp(Role::Offerer, "").await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedStatus { status: 400, .. }));
    assert!(!err.is_fatal());

    relay.stop().await.unwrap();
}

#[tokio::test]
async fn test_relay_servers_fall_back_without_a_provider() {
    init_tracing();
    let relay = RelayHarness::start().await.unwrap();

    let servers = relay.client("r1", "A").relay_servers().await.unwrap();
    assert!(!servers.is_empty());
    assert!(servers[0].urls.iter().any(|url| url.starts_with("stun:")));

    relay.stop().await.unwrap();
}

#[tokio::test]
async fn test_base_url_validation() {
    let room = RoomId::parse("r1").unwrap();
    let id = ClientId::parse("A").unwrap();

    let err = SignalClient::new("not a url", room.clone(), id.clone()).unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl(_)));

    let err =
        SignalClient::new("mailto:someone@example.com", room.clone(), id.clone()).unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl(_)));

    assert!(SignalClient::new("http://localhost:8080/relay/", room, id).is_ok());
}
