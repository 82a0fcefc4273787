use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::chain::GameId;
use crate::orchestration::GameProcessingState;
use crate::tokio_tools::spawn_named_task;

use super::{cache_key, CacheError, GameStateCache};

const LOG_TARGET: &str = "rps::cache::memory";
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Entries = Arc<RwLock<HashMap<String, Entry>>>;

/// Key-value cache holding serialized records with per-entry expiry.
pub struct InMemoryGameStateCache {
    entries: Entries,
    sweep_handle: Option<JoinHandle<()>>,
}

impl InMemoryGameStateCache {
    pub fn new() -> Self {
        Self::with_sweep_interval(SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(interval: Duration) -> Self {
        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        let sweep_handle = Self::start_sweep_task(Arc::clone(&entries), interval);
        info!(
            target: LOG_TARGET,
            sweep_interval_secs = interval.as_secs(),
            "game state cache initialized"
        );
        Self {
            entries,
            sweep_handle: Some(sweep_handle),
        }
    }

    fn start_sweep_task(entries: Entries, interval: Duration) -> JoinHandle<()> {
        spawn_named_task("game-state-cache-sweep", async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let mut entries = entries.write().await;
                let before = entries.len();
                entries.retain(|key, entry| {
                    let expired = entry.is_expired(now);
                    if expired {
                        debug!(target: LOG_TARGET, key = %key, "evicting expired entry");
                    }
                    !expired
                });
                let evicted = before - entries.len();
                if evicted > 0 {
                    debug!(
                        target: LOG_TARGET,
                        evicted,
                        remaining = entries.len(),
                        "swept game state cache"
                    );
                }
            }
        })
    }

    /// Entries still held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryGameStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InMemoryGameStateCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl GameStateCache for InMemoryGameStateCache {
    async fn get(&self, game_id: GameId) -> Result<Option<GameProcessingState>, CacheError> {
        let key = cache_key(game_id);
        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(entry) if !entry.is_expired(Instant::now()) => serde_json::from_str(&entry.payload)
                .map(Some)
                .map_err(|err| CacheError::Serialization(err.to_string())),
            _ => Ok(None),
        }
    }

    async fn set(&self, state: &GameProcessingState, ttl: Duration) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(state).map_err(|err| CacheError::Serialization(err.to_string()))?;
        let key = cache_key(state.game_id);
        debug!(
            target: LOG_TARGET,
            key = %key,
            step = %state.step,
            status = ?state.status,
            ttl_secs = ttl.as_secs(),
            "storing game state"
        );
        self.entries.write().await.insert(
            key,
            Entry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, game_id: GameId) -> Result<(), CacheError> {
        let key = cache_key(game_id);
        if self.entries.write().await.remove(&key).is_some() {
            debug!(target: LOG_TARGET, key = %key, "deleted game state");
        }
        Ok(())
    }
}
