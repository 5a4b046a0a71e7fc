//! JSON bodies and query strings of the relay's HTTP surface.

use crate::model::role::Role;
use serde::{Deserialize, Serialize};

/// One STUN/TURN server entry handed to a peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Body of `GET /relay-servers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayServers {
    pub servers: Vec<IceServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JoinResponse {
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdpPayload {
    #[serde(default)]
    pub sdp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePayload {
    #[serde(default)]
    pub candidate: String,
}

/// Acknowledgement of a state-mutating request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    pub client_id: Option<String>,
}

/// Query of `POST /room/{id}/ice`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePostQuery {
    pub from: Option<String>,
    pub client_id: Option<String>,
}

/// Query of `GET /room/{id}/ice`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateStreamQuery {
    pub to: Option<String>,
}
