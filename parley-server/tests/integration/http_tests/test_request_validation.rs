use axum::http::{Method, StatusCode};
use parley_server::router;
use serde_json::json;

use crate::utils::{call, get, init_tracing, memory_store, post, test_service};

#[tokio::test]
async fn test_join_requires_client_id() {
    init_tracing();

    let app = router(test_service(memory_store()));

    let (status, body) = post(&app, "/room/r1/join", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("clientId"));

    let (status, _) = post(&app, "/room/r1/join", json!({ "clientId": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/room/r1/join", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sdp_post_validation() {
    init_tracing();

    let app = router(test_service(memory_store()));
    post(&app, "/room/r1/join", json!({ "clientId": "A" })).await;

    let (status, _) = post(&app, "/room/r1/offer", json!({ "sdp": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing clientId");

    let (status, _) = post(&app, "/room/r1/offer?clientId=A", json!({ "sdp": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "empty sdp");

    let (status, _) = post(&app, "/room/r1/offer?clientId=A", json!({ "sdp": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "non-string sdp");
}

#[tokio::test]
async fn test_candidate_post_validation() {
    init_tracing();

    let app = router(test_service(memory_store()));
    post(&app, "/room/r1/join", json!({ "clientId": "A" })).await;

    let (status, body) = post(&app, "/room/r1/ice?clientId=A", json!({ "candidate": "c" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing from");
    assert!(body["error"].as_str().unwrap().contains("from"));

    let (status, _) = post(
        &app,
        "/room/r1/ice?from=sideways&clientId=A",
        json!({ "candidate": "c" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "unknown role");

    let (status, _) = post(&app, "/room/r1/ice?from=offerer", json!({ "candidate": "c" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing clientId");

    let (status, _) = post(
        &app,
        "/room/r1/ice?from=offerer&clientId=A",
        json!({ "candidate": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "empty candidate");

    let (status, _) = post(
        &app,
        "/room/r1/ice?from=offerer&clientId=A",
        json!({ "candidate": "line\r\nbreak" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "multi-line candidate");
}

#[tokio::test]
async fn test_stream_requires_known_recipient() {
    init_tracing();

    let app = router(test_service(memory_store()));

    let (status, _) = get(&app, "/room/r1/ice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/room/r1/ice?to=everyone").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("offerer|answerer"));
}
