use crate::engine::{DescriptionKind, EngineEvent, PeerEngine, PeerState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parley_core::IceServerConfig;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Label of the data channel the offerer opens.
pub const DATA_CHANNEL_LABEL: &str = "parley";

/// Traffic of the data channel, for whoever owns the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    Opened,
    Text(String),
    Binary(Bytes),
    Closed,
}

pub struct EngineChannels {
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub messages: mpsc::UnboundedReceiver<ChannelMessage>,
}

/// [`PeerEngine`] over the `webrtc` crate, carrying one data channel.
///
/// Cheap to clone; clones share the peer connection.
#[derive(Clone)]
pub struct WebRtcEngine {
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    message_tx: mpsc::UnboundedSender<ChannelMessage>,
}

impl WebRtcEngine {
    pub async fn new(ice_servers: &[IceServerConfig]) -> Result<(Self, EngineChannels)> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let (event_tx, events) = mpsc::unbounded_channel();
        let (message_tx, messages) = mpsc::unbounded_channel();

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!("Peer connection state changed: {}", s);
                let _ = state_tx.send(EngineEvent::ConnectionState(peer_state(s)));
                Box::pin(async {})
            },
        ));

        let ice_tx = event_tx;
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let Ok(encoded) = serde_json::to_string(&init) else {
                    return;
                };
                let _ = tx.send(EngineEvent::LocalCandidate(encoded));
            })
        }));

        let data_channel = Arc::new(Mutex::new(None));

        // The answerer receives the channel the offerer opened.
        let remote_slot = data_channel.clone();
        let remote_tx = message_tx.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let slot = remote_slot.clone();
            let tx = remote_tx.clone();
            Box::pin(async move {
                debug!("Remote data channel '{}' announced", dc.label());
                attach(&slot, &tx, dc).await;
            })
        }));

        let engine = Self {
            peer_connection,
            data_channel,
            message_tx,
        };
        Ok((engine, EngineChannels { events, messages }))
    }

    /// Sends `text` over the data channel once it exists.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        let channel = self.data_channel.lock().await.clone();
        let channel = channel.context("data channel is not established yet")?;
        channel.send_text(text.to_owned()).await?;
        Ok(())
    }

    async fn local_description_after_gathering(
        &self,
        desc: RTCSessionDescription,
    ) -> Result<String> {
        let mut gathered = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection.set_local_description(desc).await?;
        let _ = gathered.recv().await;

        let local = self
            .peer_connection
            .local_description()
            .await
            .context("local description missing after gathering")?;
        Ok(local.sdp)
    }
}

async fn attach(
    slot: &Mutex<Option<Arc<RTCDataChannel>>>,
    message_tx: &mpsc::UnboundedSender<ChannelMessage>,
    dc: Arc<RTCDataChannel>,
) {
    let open_tx = message_tx.clone();
    let label = dc.label().to_owned();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        Box::pin(async move {
            info!("Data channel '{}' open", label);
            let _ = tx.send(ChannelMessage::Opened);
        })
    }));

    let msg_tx = message_tx.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        Box::pin(async move {
            let message = if msg.is_string {
                ChannelMessage::Text(String::from_utf8_lossy(&msg.data).into_owned())
            } else {
                ChannelMessage::Binary(msg.data)
            };
            let _ = tx.send(message);
        })
    }));

    let close_tx = message_tx.clone();
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        Box::pin(async move {
            let _ = tx.send(ChannelMessage::Closed);
        })
    }));

    *slot.lock().await = Some(dc);
}

fn peer_state(s: RTCPeerConnectionState) -> PeerState {
    match s {
        RTCPeerConnectionState::Connecting => PeerState::Connecting,
        RTCPeerConnectionState::Connected => PeerState::Connected,
        RTCPeerConnectionState::Disconnected => PeerState::Disconnected,
        RTCPeerConnectionState::Failed => PeerState::Failed,
        RTCPeerConnectionState::Closed => PeerState::Closed,
        _ => PeerState::New,
    }
}

#[async_trait]
impl PeerEngine for WebRtcEngine {
    async fn create_offer(&self) -> Result<String> {
        let dc = self
            .peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await?;
        attach(&self.data_channel, &self.message_tx, dc).await;

        let offer = self.peer_connection.create_offer(None).await?;
        self.local_description_after_gathering(offer).await
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.local_description_after_gathering(answer).await
    }

    async fn apply_remote_description(&self, kind: DescriptionKind, sdp: String) -> Result<()> {
        let desc = match kind {
            DescriptionKind::Offer => RTCSessionDescription::offer(sdp)?,
            DescriptionKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &str) -> Result<()> {
        let init: RTCIceCandidateInit =
            serde_json::from_str(candidate).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(dc) = self.data_channel.lock().await.take() {
            if let Err(e) = dc.close().await {
                warn!("Failed to close data channel: {}", e);
            }
        }
        self.peer_connection.close().await?;
        Ok(())
    }
}
