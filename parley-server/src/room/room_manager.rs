use crate::error::{RelayError, RelayResult};
use crate::room::room::{Room, RoomPolicy};
use crate::room::room_command::RoomCommand;
use crate::room::room_worker::RoomWorker;
use crate::store::KeyedStore;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_core::{ClientId, Role, RoomId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{info, warn};

const COMMAND_CAPACITY: usize = 100;
const SEND_ATTEMPTS: usize = 3;

pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(60);

/// Inbox of a room's current worker, and the turn its successors wait on.
struct WorkerSlot {
    tx: mpsc::Sender<RoomCommand>,
    turn: Arc<Mutex<()>>,
}

/// Hands out [`Room`]s and routes joins to one worker per room.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, WorkerSlot>>,
    store: Arc<dyn KeyedStore>,
    policy: RoomPolicy,
    idle_timeout: Duration,
}

impl RoomManager {
    pub fn new(store: Arc<dyn KeyedStore>, policy: RoomPolicy, idle_timeout: Duration) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            store,
            policy,
            idle_timeout,
        }
    }

    pub fn room(&self, id: RoomId) -> Room {
        Room::new(id, self.store.clone(), self.policy)
    }

    /// Number of rooms with a running worker.
    pub fn active_workers(&self) -> usize {
        self.rooms.iter().filter(|slot| !slot.tx.is_closed()).count()
    }

    pub async fn join(&self, room_id: &RoomId, client_id: ClientId) -> RelayResult<Role> {
        for _ in 0..SEND_ATTEMPTS {
            let (reply, rx) = oneshot::channel();
            let cmd = RoomCommand::Join {
                client_id: client_id.clone(),
                reply,
            };

            // A worker that just went idle closes its inbox; the next attempt
            // spawns a fresh one.
            if self.room_sender(room_id).send(cmd).await.is_err() {
                continue;
            }
            match rx.await {
                Ok(result) => return result,
                Err(_) => warn!(room = %room_id, "Room worker dropped a join, retrying"),
            }
        }

        Err(RelayError::Internal(format!(
            "room {room_id} worker is unavailable"
        )))
    }

    fn room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(entry) if !entry.get().tx.is_closed() => entry.get().tx.clone(),
            // The old worker may still be draining; the new one waits its turn.
            Entry::Occupied(mut entry) => {
                let turn = entry.get().turn.clone();
                let tx = self.spawn_worker(room_id, turn.clone());
                entry.insert(WorkerSlot {
                    tx: tx.clone(),
                    turn,
                });
                tx
            }
            Entry::Vacant(entry) => {
                info!(room = %room_id, "Creating room worker");
                let turn = Arc::new(Mutex::new(()));
                let tx = self.spawn_worker(room_id, turn.clone());
                entry.insert(WorkerSlot {
                    tx: tx.clone(),
                    turn,
                });
                tx
            }
        }
    }

    fn spawn_worker(&self, room_id: &RoomId, turn: Arc<Mutex<()>>) -> mpsc::Sender<RoomCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let worker = RoomWorker::new(self.room(room_id.clone()), rx, turn, self.idle_timeout);

        let rooms = self.rooms.clone();
        let id = room_id.clone();
        tokio::spawn(async move {
            worker.run().await;
            rooms.remove_if(&id, |_, slot| slot.tx.is_closed());
        });
        tx
    }
}
