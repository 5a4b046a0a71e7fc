//! Boundary between the negotiation driver and the peer-connection stack.

mod webrtc_engine;

pub use webrtc_engine::*;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Reported by an engine on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A local candidate, already encoded for the relay.
    LocalCandidate(String),
    ConnectionState(PeerState),
}

/// A peer connection the driver negotiates.
///
/// Descriptions are returned once candidate gathering has finished, so they
/// are complete even if no trickled candidate ever reaches the other side.
#[async_trait]
pub trait PeerEngine: Send + Sync {
    async fn create_offer(&self) -> anyhow::Result<String>;

    async fn create_answer(&self) -> anyhow::Result<String>;

    async fn apply_remote_description(
        &self,
        kind: DescriptionKind,
        sdp: String,
    ) -> anyhow::Result<()>;

    async fn add_remote_candidate(&self, candidate: &str) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}
