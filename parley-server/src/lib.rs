//! Rendezvous and negotiation relay: assigns two clients their roles in a
//! room, stores their session descriptions and relays connectivity
//! candidates between them through a shared keyed store.

pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod room;
pub mod server;
pub mod signaling;
pub mod store;

pub use config::Config;
pub use error::{RelayError, RelayResult};
pub use relay::RelayDirectory;
pub use room::{Room, RoomCommand, RoomManager, RoomPolicy};
pub use signaling::{ServiceSettings, SignalingService, router};
pub use store::{KeyedStore, MemoryStore, RedisStore};
