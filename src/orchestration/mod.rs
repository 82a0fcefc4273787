//! Drives a game from join to finalization against the chain.
//!
//! Every call re-derives its starting step from on-chain state. The cache
//! only deduplicates concurrent work, remembers results, and keeps track of
//! transactions whose receipts have not arrived yet.

mod house;
mod machine;
mod response;
mod state;

pub use house::{FixedHouseStrategy, HouseService, HouseStrategy, JoinState, RandomHouseStrategy};
pub use machine::{GameOrchestrator, ResolveRequest};
pub use response::{ResolutionResponse, ResolutionStatus};
pub use state::{GameProcessingState, GameStep, ProcessingStatus};

use thiserror::Error;

use crate::cache::CacheError;
use crate::chain::{ChainError, GameId};
use crate::nonce::NonceError;
use crate::resolution::ResolutionError;
use crate::retry::Retryable;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("ciphertext for game {game_id} does not match its on-chain commitment")]
    CommitmentMismatch { game_id: GameId },

    #[error("game {game_id} is missing on-chain {field}")]
    MissingOnChainData { game_id: GameId, field: &'static str },

    #[error("game {game_id} made no progress past {step}")]
    NoProgress { game_id: GameId, step: GameStep },
}

impl OrchestrationError {
    /// Stable identifier for clients; user rejections stay distinguishable.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationError::Chain(err) => err.kind(),
            OrchestrationError::Nonce(NonceError::Chain(err)) => err.kind(),
            OrchestrationError::Cache(_) => "cache",
            OrchestrationError::Nonce(_) => "nonce",
            OrchestrationError::Resolution(_) => "resolution",
            OrchestrationError::CommitmentMismatch { .. } => "commitment_mismatch",
            OrchestrationError::MissingOnChainData { .. } => "missing_on_chain_data",
            OrchestrationError::NoProgress { .. } => "no_progress",
        }
    }

    pub fn is_already_done(&self) -> bool {
        matches!(self, OrchestrationError::Chain(err) if err.is_already_done())
    }
}

impl Retryable for OrchestrationError {
    fn is_retryable(&self) -> bool {
        match self {
            OrchestrationError::Chain(err) | OrchestrationError::Nonce(NonceError::Chain(err)) => {
                err.is_transient()
            }
            _ => false,
        }
    }
}
