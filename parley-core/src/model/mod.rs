mod peer;
mod role;
mod room;
mod signaling;

pub use peer::{ClientId, InvalidId};
pub use role::{ParseRoleError, Role};
pub use room::RoomId;
pub use signaling::{
    Ack, CandidatePayload, CandidatePostQuery, CandidateStreamQuery, ClientQuery, ErrorBody,
    HealthResponse, IceServerConfig, JoinRequest, JoinResponse, RelayServers, SdpPayload,
    ServiceInfo,
};
