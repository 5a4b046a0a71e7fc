use crate::error::RelayResult;
use parley_core::{ClientId, Role};
use tokio::sync::oneshot;

/// Commands a room worker processes one at a time.
#[derive(Debug)]
pub enum RoomCommand {
    /// A client asks for a role; the outcome goes back on `reply`.
    Join {
        client_id: ClientId,
        reply: oneshot::Sender<RelayResult<Role>>,
    },
}
