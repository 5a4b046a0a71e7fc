use crate::error::{ClientError, ClientResult};
use crate::sse::SseDecoder;
use parley_core::{
    CandidatePayload, ClientId, ErrorBody, IceServerConfig, JoinRequest, JoinResponse,
    RelayServers, Role, RoomId, SdpPayload,
};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const STREAM_BUFFER: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline of every request except the candidate stream.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client of one room on the relay, acting as one client id.
#[derive(Debug, Clone)]
pub struct SignalClient {
    http: reqwest::Client,
    base: Url,
    room: RoomId,
    client_id: ClientId,
    request_timeout: Duration,
}

impl SignalClient {
    pub fn new(base: &str, room: RoomId, client_id: ClientId) -> ClientResult<Self> {
        let base = Url::parse(base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base.to_string()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base,
            room,
            client_id,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn room_url(&self, tail: &str) -> ClientResult<Url> {
        self.url(&["room", self.room.as_str(), tail])
    }

    pub async fn join(&self) -> ClientResult<Role> {
        let resp = self
            .http
            .post(self.room_url("join")?)
            .timeout(self.request_timeout)
            .json(&JoinRequest {
                client_id: self.client_id.to_string(),
            })
            .send()
            .await?;
        let joined: JoinResponse = decode(self.check(resp).await?).await?;
        debug!(room = %self.room, role = %joined.role, "Joined room");
        Ok(joined.role)
    }

    pub async fn post_sdp(&self, role: Role, sdp: &str) -> ClientResult<()> {
        let resp = self
            .http
            .post(self.room_url(sdp_path(role))?)
            .timeout(self.request_timeout)
            .query(&[("clientId", self.client_id.as_str())])
            .json(&SdpPayload { sdp: sdp.to_owned() })
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }

    /// `None` while the blob of `role` has not been posted.
    pub async fn get_sdp(&self, role: Role) -> ClientResult<Option<String>> {
        let resp = self
            .http
            .get(self.room_url(sdp_path(role))?)
            .timeout(self.request_timeout)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let payload: SdpPayload = decode(self.check(resp).await?).await?;
        Ok(Some(payload.sdp))
    }

    pub async fn post_candidate(&self, from: Role, candidate: &str) -> ClientResult<()> {
        let resp = self
            .http
            .post(self.room_url("ice")?)
            .timeout(self.request_timeout)
            .query(&[("from", from.as_str()), ("clientId", self.client_id.as_str())])
            .json(&CandidatePayload {
                candidate: candidate.to_owned(),
            })
            .send()
            .await?;
        self.check(resp).await?;
        Ok(())
    }

    /// Opens the candidate stream addressed to `to`. Payloads are read by a
    /// background task until the stream is dropped or the relay closes it.
    /// The stream has no request deadline.
    pub async fn subscribe_candidates(&self, to: Role) -> ClientResult<CandidateStream> {
        let resp = self
            .http
            .get(self.room_url("ice")?)
            .query(&[("to", to.as_str())])
            .send()
            .await?;
        let resp = self.check(resp).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let room = self.room.clone();
        let reader = tokio::spawn(read_events(resp, tx, room, to));
        Ok(CandidateStream { rx, reader })
    }

    pub async fn relay_servers(&self) -> ClientResult<Vec<IceServerConfig>> {
        let resp = self
            .http
            .get(self.url(&["relay-servers"])?)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let servers: RelayServers = decode(self.check(resp).await?).await?;
        Ok(servers.servers)
    }

    async fn check(&self, resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(match status {
            StatusCode::CONFLICT => ClientError::RoomFull(self.room.clone()),
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            _ => ClientError::UnexpectedStatus {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn sdp_path(role: Role) -> &'static str {
    match role {
        Role::Offerer => "offer",
        Role::Answerer => "answer",
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn read_events(mut resp: Response, tx: mpsc::Sender<String>, room: RoomId, to: Role) {
    let mut decoder = SseDecoder::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                for payload in decoder.feed(&chunk) {
                    if tx.send(payload).await.is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                debug!(%room, %to, "Relay closed the candidate stream");
                return;
            }
            Err(e) => {
                warn!(%room, %to, error = %e, "Candidate stream failed");
                return;
            }
        }
    }
}

/// Remote candidates addressed to this client, backlog first.
pub struct CandidateStream {
    rx: mpsc::Receiver<String>,
    reader: JoinHandle<()>,
}

impl CandidateStream {
    /// `None` once the relay has closed the stream.
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for CandidateStream {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
