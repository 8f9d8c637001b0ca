use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::Occasion;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TrendSnapshot { user_id: Uuid, occasion: Occasion },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TrendSnapshot { user_id, occasion } => {
                write!(f, "trends:{}:{}", occasion, user_id.simple())
            }
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Pending write for the background writer
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed cache for collaborator responses
///
/// Reads go straight to Redis. Writes are handed to a background task so a
/// slow Redis never adds latency to a recommendation call.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Owns the background writer; dropping every `Cache` clone or calling
/// `shutdown` lets it drain and exit
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer to flush queued writes and waits for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(Self::run_writer(client, write_rx, shutdown_rx));

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                maybe_write = write_rx.recv() => match maybe_write {
                    Some(write) => Self::write_logged(&client, write).await,
                    None => break,
                },
                _ = shutdown_rx.recv() => {
                    // Take what is already queued, then stop.
                    while let Ok(write) = write_rx.try_recv() {
                        Self::write_logged(&client, write).await;
                    }
                    break;
                }
            }
        }
    }

    async fn write_logged(client: &Client, write: PendingWrite) {
        let key = write.key.clone();
        if let Err(e) = Self::write(client, write).await {
            tracing::error!(error = %e, key = %key, "Failed to write to Redis cache");
        }
    }

    async fn write(client: &Client, write: PendingWrite) -> EngineResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }

    /// Reads and deserializes a cached value; `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> EngineResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    EngineError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a write; returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendSnapshot;

    #[test]
    fn test_trend_key_display() {
        let user_id = Uuid::parse_str("6f1c2f9e-8c4e-4b8e-9a52-2d7e4d1c0b3a").unwrap();
        let key = CacheKey::TrendSnapshot {
            user_id,
            occasion: Occasion::Work,
        };
        assert_eq!(key.to_string(), "trends:work:6f1c2f9e8c4e4b8e9a522d7e4d1c0b3a");
    }

    #[test]
    fn test_keys_differ_by_occasion() {
        let user_id = Uuid::new_v4();
        let casual = CacheKey::TrendSnapshot {
            user_id,
            occasion: Occasion::Casual,
        };
        let formal = CacheKey::TrendSnapshot {
            user_id,
            occasion: Occasion::Formal,
        };
        assert_ne!(casual.to_string(), formal.to_string());
    }

    // Needs a running Redis: `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_background_write_is_readable_after_shutdown() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone());

        let key = CacheKey::TrendSnapshot {
            user_id: Uuid::new_v4(),
            occasion: Occasion::Casual,
        };
        let snapshot = TrendSnapshot {
            trending_colors: vec!["sage".to_string()],
            ..TrendSnapshot::default()
        };

        cache.set_in_background(&key, &snapshot, 60);
        handle.shutdown().await;

        let cached: Option<TrendSnapshot> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(cached, Some(snapshot));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
