//! Short-lived processing status per game.
//!
//! Entries are a hint for deduplicating concurrent work and for polling
//! clients; the chain remains the source of truth.

mod memory;

pub use memory::InMemoryGameStateCache;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::GameId;
use crate::orchestration::GameProcessingState;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("failed to (de)serialize cache entry: {0}")]
    Serialization(String),
}

pub fn cache_key(game_id: GameId) -> String {
    format!("game:{game_id}")
}

#[async_trait]
pub trait GameStateCache: Send + Sync {
    async fn get(&self, game_id: GameId) -> Result<Option<GameProcessingState>, CacheError>;

    /// Replace the whole record; it expires after `ttl`.
    async fn set(&self, state: &GameProcessingState, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, game_id: GameId) -> Result<(), CacheError>;
}
