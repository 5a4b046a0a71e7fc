use crate::error::{RelayError, RelayResult};
use crate::store::{KeyedStore, Subscription};
use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`KeyedStore`] over redis.
///
/// Commands share one auto-reconnecting [`ConnectionManager`]; every
/// subscription opens its own pub/sub connection, which is closed when the
/// returned stream is dropped.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| RelayError::StoreUnavailable("timed out connecting to redis".into()))??;
        Ok(Self { client, conn })
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyedStore for RedisStore {
    async fn get_string(&self, key: &str) -> RelayResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn get_all_fields(&self, key: &str) -> RelayResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, ttl_secs(ttl) as i64).await?;
        Ok(())
    }

    async fn append_to_list(&self, key: &str, value: &str) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn read_list(&self, key: &str) -> RelayResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(key, 0, -1).await?)
    }

    async fn publish(&self, channel: &str, payload: &str) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> RelayResult<Subscription> {
        let mut pubsub = timeout(CONNECT_TIMEOUT, self.client.get_async_pubsub())
            .await
            .map_err(|_| {
                RelayError::StoreUnavailable("timed out opening redis pub/sub connection".into())
            })??;
        pubsub.subscribe(channel).await?;

        let channel = channel.to_owned();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let payload = match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Dropping non-text payload");
                    None
                }
            };
            futures::future::ready(payload)
        });
        Ok(stream.boxed())
    }

    async fn ping(&self) -> RelayResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
