use crate::error::{RelayError, RelayResult};
use crate::store::{KeyedStore, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 256;

enum Value {
    Text(String),
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Single-process store with redis-like semantics.
///
/// Expiry is lazy and measured on the tokio clock, so a paused test runtime
/// controls it. Pub/sub channels are broadcast channels created on first use
/// and removed when their last subscription is dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

/// Subscription that removes its channel once no receiver is left.
struct ChannelSubscription {
    inner: Subscription,
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
    channel: String,
}

impl Stream for ChannelSubscription {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        // Release the receiver first so it no longer counts.
        self.inner = futures::stream::empty().boxed();
        self.channels
            .remove_if(&self.channel, |_, tx| tx.receiver_count() == 0);
    }
}

fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|e| !e.is_live(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> RelayError {
    RelayError::StoreUnavailable(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get_string(&self, key: &str) -> RelayResult<Option<String>> {
        let mut entries = self.entries.lock();
        match live_entry(&mut entries, key, Instant::now()) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        let entry = Entry {
            value: Value::Text(value.to_owned()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.lock().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> RelayResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn get_all_fields(&self, key: &str) -> RelayResult<HashMap<String, String>> {
        let mut entries = self.entries.lock();
        match live_entry(&mut entries, key, Instant::now()) {
            None => Ok(HashMap::new()),
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok(fields.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> RelayResult<()> {
        let mut entries = self.entries.lock();
        if live_entry(&mut entries, key, Instant::now()).is_none() {
            entries.insert(
                key.to_owned(),
                Entry {
                    value: Value::Hash(HashMap::new()),
                    expires_at: None,
                },
            );
        }
        match entries.get_mut(key) {
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => {
                fields.insert(field.to_owned(), value.to_owned());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> RelayResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = live_entry(&mut entries, key, now) {
            entry.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn append_to_list(&self, key: &str, value: &str) -> RelayResult<()> {
        let mut entries = self.entries.lock();
        if live_entry(&mut entries, key, Instant::now()).is_none() {
            entries.insert(
                key.to_owned(),
                Entry {
                    value: Value::List(Vec::new()),
                    expires_at: None,
                },
            );
        }
        match entries.get_mut(key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => {
                items.push(value.to_owned());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn read_list(&self, key: &str) -> RelayResult<Vec<String>> {
        let mut entries = self.entries.lock();
        match live_entry(&mut entries, key, Instant::now()) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn publish(&self, channel: &str, payload: &str) -> RelayResult<()> {
        let Some(tx) = self.channels.get(channel).map(|tx| tx.clone()) else {
            return Ok(());
        };
        if tx.send(payload.to_owned()).is_err() {
            self.channels
                .remove_if(channel, |_, tx| tx.receiver_count() == 0);
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> RelayResult<Subscription> {
        let rx = self
            .channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();

        let name = channel.to_owned();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let payload = match item {
                Ok(payload) => Some(payload),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(channel = %name, skipped, "Subscriber lagged behind, payloads dropped");
                    None
                }
            };
            futures::future::ready(payload)
        });
        Ok(ChannelSubscription {
            inner: stream.boxed(),
            channels: self.channels.clone(),
            channel: channel.to_owned(),
        }
        .boxed())
    }

    async fn ping(&self) -> RelayResult<()> {
        Ok(())
    }
}
