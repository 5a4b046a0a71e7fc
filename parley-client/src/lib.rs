//! Client side of the negotiation relay: an HTTP signaling client and a
//! driver that walks a peer engine through the offer/answer exchange.

pub mod driver;
pub mod engine;
pub mod error;
pub mod signal_client;
pub mod sse;

pub use driver::{DriverState, NegotiationDriver};
pub use engine::{DescriptionKind, EngineEvent, PeerEngine, PeerState};
pub use error::{ClientError, ClientResult};
pub use signal_client::{CandidateStream, SignalClient};
