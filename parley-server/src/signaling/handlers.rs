//! HTTP handlers of the negotiation relay.

use crate::error::{RelayError, RelayResult};
use crate::signaling::candidate_stream::candidate_events;
use crate::signaling::signaling_service::SignalingService;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use parley_core::{
    Ack, CandidatePayload, CandidatePostQuery, CandidateStreamQuery, ClientId, ClientQuery,
    HealthResponse, JoinRequest, JoinResponse, RelayServers, Role, RoomId, SdpPayload,
    ServiceInfo,
};

fn room_id(raw: String) -> RelayResult<RoomId> {
    RoomId::parse(raw).map_err(|e| RelayError::BadRequest(e.to_string()))
}

fn client_id(raw: Option<String>) -> RelayResult<ClientId> {
    ClientId::parse(raw.unwrap_or_default()).map_err(|e| RelayError::BadRequest(e.to_string()))
}

fn role(name: &str, raw: Option<String>) -> RelayResult<Role> {
    raw.as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| RelayError::BadRequest(format!("{name} must be offerer|answerer")))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> RelayResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| RelayError::BadRequest(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> RelayResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| RelayError::BadRequest(rejection.body_text()))
}

pub async fn join_room(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> RelayResult<Json<JoinResponse>> {
    let room = room_id(id)?;
    let client = client_id(Some(body(payload)?.client_id))?;

    let role = service.rooms().join(&room, client).await?;
    Ok(Json(JoinResponse { role }))
}

async fn post_sdp(
    service: SignalingService,
    id: String,
    role: Role,
    params: Result<Query<ClientQuery>, QueryRejection>,
    payload: Result<Json<SdpPayload>, JsonRejection>,
) -> RelayResult<Json<Ack>> {
    let room = room_id(id)?;
    let client = client_id(query(params)?.client_id)?;
    let sdp = body(payload)?.sdp;
    if sdp.is_empty() {
        return Err(RelayError::BadRequest("sdp must not be empty".into()));
    }

    service.rooms().room(room).post_sdp(&client, role, &sdp).await?;
    Ok(Json(Ack::OK))
}

async fn get_sdp(
    service: SignalingService,
    id: String,
    role: Role,
) -> RelayResult<Json<SdpPayload>> {
    let room = room_id(id)?;
    let kind = match role {
        Role::Offerer => "offer",
        Role::Answerer => "answer",
    };

    match service.rooms().room(room).get_sdp(role).await? {
        Some(sdp) => Ok(Json(SdpPayload { sdp })),
        None => Err(RelayError::NotFound(kind.into())),
    }
}

pub async fn post_offer(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
    params: Result<Query<ClientQuery>, QueryRejection>,
    payload: Result<Json<SdpPayload>, JsonRejection>,
) -> RelayResult<Json<Ack>> {
    post_sdp(service, id, Role::Offerer, params, payload).await
}

pub async fn get_offer(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
) -> RelayResult<Json<SdpPayload>> {
    get_sdp(service, id, Role::Offerer).await
}

pub async fn post_answer(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
    params: Result<Query<ClientQuery>, QueryRejection>,
    payload: Result<Json<SdpPayload>, JsonRejection>,
) -> RelayResult<Json<Ack>> {
    post_sdp(service, id, Role::Answerer, params, payload).await
}

pub async fn get_answer(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
) -> RelayResult<Json<SdpPayload>> {
    get_sdp(service, id, Role::Answerer).await
}

pub async fn post_candidate(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
    params: Result<Query<CandidatePostQuery>, QueryRejection>,
    payload: Result<Json<CandidatePayload>, JsonRejection>,
) -> RelayResult<Json<Ack>> {
    let room = room_id(id)?;
    let params = query(params)?;
    let from = role("from", params.from)?;
    let client = client_id(params.client_id)?;

    let candidate = body(payload)?.candidate;
    if candidate.is_empty() {
        return Err(RelayError::BadRequest("candidate must not be empty".into()));
    }
    if candidate.contains(['\r', '\n']) {
        return Err(RelayError::BadRequest("candidate must be a single line".into()));
    }

    service
        .rooms()
        .room(room)
        .post_candidate(&client, from, &candidate)
        .await?;
    Ok(Json(Ack::OK))
}

pub async fn stream_candidates(
    State(service): State<SignalingService>,
    Path(id): Path<String>,
    params: Result<Query<CandidateStreamQuery>, QueryRejection>,
) -> RelayResult<impl IntoResponse> {
    let room = room_id(id)?;
    let to = role("to", query(params)?.to)?;

    let candidates = service.rooms().room(room.clone()).stream_candidates(to).await?;
    Ok(candidate_events(
        room,
        to,
        candidates,
        service.settings().keepalive,
        service.shutdown_token(),
    ))
}

pub async fn relay_servers(State(service): State<SignalingService>) -> Json<RelayServers> {
    Json(RelayServers {
        servers: service.relay().resolve().await,
    })
}

pub async fn health(State(service): State<SignalingService>) -> RelayResult<Json<HealthResponse>> {
    service.store().ping().await?;
    Ok(Json(HealthResponse {
        status: "healthy".into(),
        service: service.settings().service_name.clone(),
    }))
}

pub async fn service_info(State(service): State<SignalingService>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: service.settings().service_name.clone(),
        version: env!("CARGO_PKG_VERSION").into(),
        endpoints: [
            "/room/{id}/join",
            "/room/{id}/offer",
            "/room/{id}/answer",
            "/room/{id}/ice",
            "/relay-servers",
            "/health",
        ]
        .map(String::from)
        .to_vec(),
    })
}
