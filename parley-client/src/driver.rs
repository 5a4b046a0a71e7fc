use crate::engine::{DescriptionKind, EngineEvent, PeerEngine, PeerState};
use crate::error::{ClientError, ClientResult};
use crate::signal_client::{CandidateStream, SignalClient};
use parley_core::Role;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Joining,
    RoleKnown(Role),
    Negotiating(Role),
    Connected(Role),
    Failed(String),
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Connected(_) | DriverState::Failed(_))
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Joining => f.write_str("joining"),
            DriverState::RoleKnown(role) => write!(f, "joined as {role}"),
            DriverState::Negotiating(role) => write!(f, "negotiating as {role}"),
            DriverState::Connected(role) => write!(f, "connected as {role}"),
            DriverState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Walks a [`PeerEngine`] through the offer/answer exchange over the relay.
///
/// The offerer posts its offer and polls for the answer; the answerer polls
/// for the offer and posts its answer. Both sides post their local
/// candidates and apply the remote ones streamed by the relay. Remote
/// candidates that arrive before the remote description are held back until
/// it is applied.
pub struct NegotiationDriver<E> {
    client: SignalClient,
    engine: E,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    expected_role: Option<Role>,
    poll_interval: Duration,
    state_tx: watch::Sender<DriverState>,
    remote_applied: bool,
    held_candidates: Vec<String>,
}

impl<E: PeerEngine> NegotiationDriver<E> {
    pub fn new(
        client: SignalClient,
        engine: E,
        events: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(DriverState::Joining);
        Self {
            client,
            engine,
            events,
            expected_role: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state_tx,
            remote_applied: false,
            held_candidates: Vec::new(),
        }
    }

    /// Fails the run unless the relay assigns `role`.
    pub fn expect_role(mut self, role: Role) -> Self {
        self.expected_role = Some(role);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> watch::Receiver<DriverState> {
        self.state_tx.subscribe()
    }

    /// Negotiates, then keeps relaying candidates until `cancel` fires or
    /// the connection fails or closes. The engine is closed on return.
    pub async fn run(mut self, cancel: CancellationToken) -> ClientResult<Role> {
        let outcome = self.drive(&cancel).await;
        if let Err(e) = &outcome {
            warn!(room = %self.client.room(), error = %e, "Negotiation failed");
            self.publish(DriverState::Failed(e.to_string()));
        }
        if let Err(e) = self.engine.close().await {
            warn!("Failed to close engine: {:#}", e);
        }
        outcome
    }

    fn publish(&self, state: DriverState) {
        debug!(room = %self.client.room(), %state, "Driver state");
        self.state_tx.send_replace(state);
    }

    async fn drive(&mut self, cancel: &CancellationToken) -> ClientResult<Role> {
        self.publish(DriverState::Joining);
        let role = cancellable(cancel, self.client.join()).await?;
        if let Some(expected) = self.expected_role
            && expected != role
        {
            return Err(ClientError::RoleMismatch {
                expected,
                actual: role,
            });
        }
        self.publish(DriverState::RoleKnown(role));
        info!(room = %self.client.room(), %role, "Joined room");

        self.publish(DriverState::Negotiating(role));
        let mut remote = match role {
            Role::Offerer => {
                let offer = self.engine.create_offer();
                let offer = cancellable(cancel, async { offer.await.map_err(ClientError::engine) })
                    .await?;
                cancellable(cancel, self.client.post_sdp(role, &offer)).await?;
                let remote = cancellable(cancel, self.client.subscribe_candidates(role)).await?;
                let mut remote = Some(remote);

                let answer = self.poll_remote_sdp(cancel, role.opposite(), &mut remote).await?;
                self.apply_remote(DescriptionKind::Answer, answer).await?;
                remote
            }
            Role::Answerer => {
                let remote = cancellable(cancel, self.client.subscribe_candidates(role)).await?;
                let mut remote = Some(remote);

                let offer = self.poll_remote_sdp(cancel, role.opposite(), &mut remote).await?;
                self.apply_remote(DescriptionKind::Offer, offer).await?;
                let answer = self.engine.create_answer();
                let answer = cancellable(cancel, async { answer.await.map_err(ClientError::engine) })
                    .await?;
                cancellable(cancel, self.client.post_sdp(role, &answer)).await?;
                remote
            }
        };

        self.publish(DriverState::Connected(role));
        info!(room = %self.client.room(), %role, "Negotiation complete");

        self.relay_until_done(cancel, role, &mut remote).await?;
        Ok(role)
    }

    /// Polls for the other side's description while relaying candidates.
    async fn poll_remote_sdp(
        &mut self,
        cancel: &CancellationToken,
        of: Role,
        remote: &mut Option<CandidateStream>,
    ) -> ClientResult<String> {
        let own = of.opposite();
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = ticker.tick() => match cancellable(cancel, self.client.get_sdp(of)).await {
                    Ok(Some(sdp)) => return Ok(sdp),
                    Ok(None) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!(error = %e, "Polling for the {} description failed", of),
                },
                candidate = next_remote(remote) => {
                    self.on_remote_candidate(remote, candidate).await
                }
                Some(event) = self.events.recv() => {
                    self.on_engine_event(cancel, own, event).await?
                }
            }
        }
    }

    async fn relay_until_done(
        &mut self,
        cancel: &CancellationToken,
        role: Role,
        remote: &mut Option<CandidateStream>,
    ) -> ClientResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                candidate = next_remote(remote) => {
                    self.on_remote_candidate(remote, candidate).await
                }
                event = self.events.recv() => match event {
                    Some(EngineEvent::ConnectionState(PeerState::Closed)) | None => return Ok(()),
                    Some(event) => self.on_engine_event(cancel, role, event).await?,
                },
            }
        }
    }

    async fn apply_remote(&mut self, kind: DescriptionKind, sdp: String) -> ClientResult<()> {
        self.engine
            .apply_remote_description(kind, sdp)
            .await
            .map_err(ClientError::engine)?;
        self.remote_applied = true;

        for candidate in std::mem::take(&mut self.held_candidates) {
            self.add_remote_candidate(&candidate).await;
        }
        Ok(())
    }

    async fn on_remote_candidate(
        &mut self,
        remote: &mut Option<CandidateStream>,
        candidate: Option<String>,
    ) {
        let Some(candidate) = candidate else {
            debug!(room = %self.client.room(), "Remote candidate stream ended");
            *remote = None;
            return;
        };
        if self.remote_applied {
            self.add_remote_candidate(&candidate).await;
        } else {
            self.held_candidates.push(candidate);
        }
    }

    async fn add_remote_candidate(&self, candidate: &str) {
        if let Err(e) = self.engine.add_remote_candidate(candidate).await {
            warn!("Ignoring remote candidate: {:#}", e);
        }
    }

    async fn on_engine_event(
        &self,
        cancel: &CancellationToken,
        role: Role,
        event: EngineEvent,
    ) -> ClientResult<()> {
        match event {
            EngineEvent::LocalCandidate(candidate) => {
                // A cancelled post is left to the caller's cancellation arm.
                match cancellable(cancel, self.client.post_candidate(role, &candidate)).await {
                    Ok(()) | Err(ClientError::Cancelled) => {}
                    Err(e) => warn!(error = %e, "Failed to post local candidate"),
                }
                Ok(())
            }
            EngineEvent::ConnectionState(PeerState::Failed) => {
                Err(ClientError::Engine("peer connection failed".into()))
            }
            EngineEvent::ConnectionState(state) => {
                debug!(%state, "Peer connection state");
                Ok(())
            }
        }
    }
}

/// Next remote candidate, or pending forever once the stream is gone.
async fn next_remote(remote: &mut Option<CandidateStream>) -> Option<String> {
    match remote {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        result = fut => result,
    }
}
