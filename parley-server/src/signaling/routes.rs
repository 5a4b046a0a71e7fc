use crate::signaling::handlers::*;
use crate::signaling::signaling_service::SignalingService;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/relay-servers", get(relay_servers))
        // Path used by older clients.
        .route("/ice", get(relay_servers))
        .route("/room/{id}/join", post(join_room))
        .route("/room/{id}/offer", post(post_offer).get(get_offer))
        .route("/room/{id}/answer", post(post_answer).get(get_answer))
        .route("/room/{id}/ice", post(post_candidate).get(stream_candidates))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}
