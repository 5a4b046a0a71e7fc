use crate::room::room::Room;
use crate::room::room_command::RoomCommand;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::{debug, info};

/// Serializes role assignment for one room.
///
/// Exits after `idle_timeout` without commands. Before exiting it closes its
/// inbox and drains whatever was already queued, so no join is lost.
///
/// Workers of the same room share `turn` and hold it for their whole run: a
/// replacement spawned while its predecessor drains starts only once the
/// predecessor is done.
pub struct RoomWorker {
    room: Room,
    command_rx: mpsc::Receiver<RoomCommand>,
    turn: Arc<Mutex<()>>,
    idle_timeout: Duration,
}

impl RoomWorker {
    pub fn new(
        room: Room,
        command_rx: mpsc::Receiver<RoomCommand>,
        turn: Arc<Mutex<()>>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            room,
            command_rx,
            turn,
            idle_timeout,
        }
    }

    pub async fn run(mut self) {
        let _turn = self.turn.clone().lock_owned().await;
        debug!(room = %self.room.id(), "Room worker started");

        loop {
            match timeout(self.idle_timeout, self.command_rx.recv()).await {
                Ok(Some(cmd)) => self.handle_command(cmd).await,
                Ok(None) => break,
                Err(_) => {
                    self.command_rx.close();
                    while let Ok(cmd) = self.command_rx.try_recv() {
                        self.handle_command(cmd).await;
                    }
                    break;
                }
            }
        }

        debug!(room = %self.room.id(), "Room worker stopped");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { client_id, reply } => {
                let result = self.room.assign_role(&client_id).await;
                match &result {
                    Ok(role) => {
                        info!(room = %self.room.id(), client = %client_id, %role, "Client joined")
                    }
                    Err(e) => {
                        let room = self.room.id();
                        debug!(%room, client = %client_id, error = %e, "Join rejected")
                    }
                }
                // The caller may have given up waiting.
                let _ = reply.send(result);
            }
        }
    }
}
