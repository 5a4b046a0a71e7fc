use crate::error::{RelayError, RelayResult};
use crate::room::retry::RetryPolicy;
use crate::store::{KeyedStore, Subscription};
use futures::StreamExt;
use futures::stream;
use parley_core::{ClientId, Role, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sliding expiry shared by every key of a room.
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
pub struct RoomPolicy {
    pub ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_ROOM_TTL,
            retry: RetryPolicy::default(),
        }
    }
}

/// Negotiation state of one room, read and written through the keyed store.
///
/// A `Room` holds no state of its own and is built per request. Role
/// assignment must go through the room's worker (see
/// [`RoomManager::join`](crate::room::RoomManager::join)); every other
/// operation is safe to run concurrently.
#[derive(Clone)]
pub struct Room {
    id: RoomId,
    store: Arc<dyn KeyedStore>,
    policy: RoomPolicy,
}

impl Room {
    pub fn new(id: RoomId, store: Arc<dyn KeyedStore>, policy: RoomPolicy) -> Self {
        Self { id, store, policy }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    fn roles_key(&self) -> String {
        format!("room:{}:roles", self.id)
    }

    fn sdp_key(&self, role: Role) -> String {
        match role {
            Role::Offerer => format!("room:{}:offer", self.id),
            Role::Answerer => format!("room:{}:answer", self.id),
        }
    }

    /// Backlog of candidates posted by `side`.
    fn backlog_key(&self, side: Role) -> String {
        format!("room:{}:ice:{}", self.id, side)
    }

    /// Live channel of candidates addressed to `to`.
    fn channel(&self, to: Role) -> String {
        format!("chan:{}:ice:{}", self.id, to)
    }

    /// Assigns `client` a role, or returns the one it already holds.
    ///
    /// The read-then-write below is not atomic; callers serialize it per
    /// room.
    pub(crate) async fn assign_role(&self, client: &ClientId) -> RelayResult<Role> {
        self.policy
            .retry
            .run("join", || async move { self.try_assign_role(client).await })
            .await
    }

    async fn try_assign_role(&self, client: &ClientId) -> RelayResult<Role> {
        let key = self.roles_key();
        let roles = self.store.get_all_fields(&key).await?;

        if let Some(role) = role_of(&roles, client) {
            self.store.refresh_ttl(&key, self.policy.ttl).await?;
            return Ok(role);
        }

        let taken = |role: Role| roles.values().any(|held| held.parse::<Role>().ok() == Some(role));
        let role = if !taken(Role::Offerer) {
            Role::Offerer
        } else if !taken(Role::Answerer) {
            Role::Answerer
        } else {
            return Err(RelayError::RoomFull(self.id.clone()));
        };

        self.store
            .set_field(&key, client.as_str(), role.as_str())
            .await?;
        self.store.refresh_ttl(&key, self.policy.ttl).await?;
        Ok(role)
    }

    async fn ensure_role(&self, client: &ClientId, role: Role) -> RelayResult<()> {
        let roles = self.store.get_all_fields(&self.roles_key()).await?;
        match role_of(&roles, client) {
            Some(held) if held == role => Ok(()),
            _ => Err(RelayError::Forbidden(format!(
                "client {client} does not hold the {role} role in room {}",
                self.id
            ))),
        }
    }

    /// Stores the negotiation blob of `role` and drops the candidates that
    /// side announced for the previous blob.
    pub async fn post_sdp(&self, client: &ClientId, role: Role, sdp: &str) -> RelayResult<()> {
        self.policy
            .retry
            .run("post_sdp", || async move {
                self.ensure_role(client, role).await?;
                self.store
                    .set_string(&self.sdp_key(role), sdp, self.policy.ttl)
                    .await?;
                self.store.delete_key(&self.backlog_key(role)).await
            })
            .await?;

        debug!(room = %self.id, %role, bytes = sdp.len(), "Negotiation blob stored");
        Ok(())
    }

    pub async fn get_sdp(&self, role: Role) -> RelayResult<Option<String>> {
        self.policy
            .retry
            .run("get_sdp", || async move {
                self.store.get_string(&self.sdp_key(role)).await
            })
            .await
    }

    /// Appends `candidate` to the backlog of `role` and forwards it to the
    /// opposite side's live channel.
    ///
    /// A retried attempt may append the same candidate twice; receivers apply
    /// candidates idempotently.
    pub async fn post_candidate(
        &self,
        client: &ClientId,
        role: Role,
        candidate: &str,
    ) -> RelayResult<()> {
        self.policy
            .retry
            .run("post_candidate", || async move {
                self.ensure_role(client, role).await?;
                let backlog = self.backlog_key(role);
                self.store.append_to_list(&backlog, candidate).await?;
                self.store.refresh_ttl(&backlog, self.policy.ttl).await?;
                self.store
                    .publish(&self.channel(role.opposite()), candidate)
                    .await
            })
            .await?;

        debug!(room = %self.id, from = %role, "Candidate relayed");
        Ok(())
    }

    /// Every candidate addressed to `to`: first the backlog the other side
    /// has posted so far, in append order, then live ones as they arrive.
    ///
    /// The live subscription is opened before the backlog is read, so a
    /// candidate posted while the stream starts is delivered at least once,
    /// possibly twice. The stream never ends on its own; dropping it
    /// releases the subscription.
    pub async fn stream_candidates(&self, to: Role) -> RelayResult<Subscription> {
        let channel = self.channel(to);
        let live = self
            .policy
            .retry
            .run("subscribe", || {
                let channel = channel.as_str();
                async move { self.store.subscribe(channel).await }
            })
            .await?;

        let backlog_key = self.backlog_key(to.opposite());
        let backlog = self
            .policy
            .retry
            .run("read_backlog", || {
                let key = backlog_key.as_str();
                async move { self.store.read_list(key).await }
            })
            .await?;

        debug!(room = %self.id, %to, replayed = backlog.len(), "Candidate stream opened");
        Ok(stream::iter(backlog).chain(live).boxed())
    }
}

fn role_of(roles: &HashMap<String, String>, client: &ClientId) -> Option<Role> {
    roles.get(client.as_str()).and_then(|r| r.parse().ok())
}
