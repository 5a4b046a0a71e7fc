use anyhow::{Result, bail};
use async_trait::async_trait;
use parley_client::{DescriptionKind, EngineEvent, PeerEngine};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Everything the driver did to a [`ScriptedEngine`].
#[derive(Debug, Default, Clone)]
pub struct EngineLog {
    pub remote_description: Option<(DescriptionKind, String)>,
    pub remote_candidates: Vec<String>,
    /// Candidates handed over before any remote description.
    pub early_candidates: Vec<String>,
    pub closed: bool,
}

/// Engine producing `"{name}-offer"`/`"{name}-answer"` descriptions and one
/// `"{name}-cand-1"` local candidate per description.
#[derive(Clone)]
pub struct ScriptedEngine {
    name: String,
    events: mpsc::UnboundedSender<EngineEvent>,
    log: Arc<Mutex<EngineLog>>,
}

impl ScriptedEngine {
    pub fn new(name: &str) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Self {
            name: name.to_string(),
            events,
            log: Arc::default(),
        };
        (engine, rx)
    }

    pub fn log(&self) -> EngineLog {
        self.log.lock().unwrap().clone()
    }

    /// Injects an engine event as if the peer connection reported it.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn describe(&self, kind: &str) -> String {
        self.emit(EngineEvent::LocalCandidate(format!("{}-cand-1", self.name)));
        format!("{}-{}", self.name, kind)
    }
}

#[async_trait]
impl PeerEngine for ScriptedEngine {
    async fn create_offer(&self) -> Result<String> {
        Ok(self.describe("offer"))
    }

    async fn create_answer(&self) -> Result<String> {
        if self.log.lock().unwrap().remote_description.is_none() {
            bail!("answer requested before the offer was applied");
        }
        Ok(self.describe("answer"))
    }

    async fn apply_remote_description(&self, kind: DescriptionKind, sdp: String) -> Result<()> {
        self.log.lock().unwrap().remote_description = Some((kind, sdp));
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.remote_description.is_none() {
            log.early_candidates.push(candidate.to_string());
            bail!("no remote description");
        }
        log.remote_candidates.push(candidate.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}
