use axum::http::StatusCode;
use parley_server::router;
use serde_json::json;

use crate::utils::{get, init_tracing, memory_store, post, test_service};

#[tokio::test]
async fn test_two_clients_exchange_descriptions() {
    init_tracing();

    let app = router(test_service(memory_store()));

    let (status, body) = post(&app, "/room/r1/join", json!({ "clientId": "A" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "role": "offerer" }));

    let (status, body) = post(&app, "/room/r1/join", json!({ "clientId": "B" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "role": "answerer" }));

    let (status, body) = post(&app, "/room/r1/join", json!({ "clientId": "C" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, body) = post(&app, "/room/r1/offer?clientId=A", json!({ "sdp": "offer-blob" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = get(&app, "/room/r1/answer").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, _) = post(&app, "/room/r1/answer?clientId=B", json!({ "sdp": "answer-blob" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/room/r1/offer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sdp": "offer-blob" }));

    let (status, body) = get(&app, "/room/r1/answer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sdp": "answer-blob" }));
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    init_tracing();

    let app = router(test_service(memory_store()));
    post(&app, "/room/r1/join", json!({ "clientId": "A" })).await;
    post(&app, "/room/r1/join", json!({ "clientId": "B" })).await;

    let (status, body) = post(&app, "/room/r1/offer?clientId=B", json!({ "sdp": "x" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    let (status, _) = post(
        &app,
        "/room/r1/ice?from=answerer&clientId=A",
        json!({ "candidate": "c" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_legacy_role_names_are_accepted() {
    init_tracing();

    let app = router(test_service(memory_store()));
    post(&app, "/room/r1/join", json!({ "clientId": "A" })).await;

    let (status, _) = post(
        &app,
        "/room/r1/ice?from=offer&clientId=A",
        json!({ "candidate": "c" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
