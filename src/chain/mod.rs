//! Boundary to the game contract.
//!
//! The orchestrator only talks to the chain through [`ChainClient`]. The
//! [`InMemoryChain`] implementation enforces the same contract rules locally.

mod error;
mod memory;
mod types;

pub use error::ChainError;
pub use memory::{ChainOp, InMemoryChain};
pub use types::{
    Address, GameCall, GameEvent, GameId, GameInfo, TransactionRequest, TxHash, TxReceipt,
};

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn game_info(&self, game_id: GameId) -> Result<GameInfo, ChainError>;

    /// Next nonce for `signer`, counting transactions not yet mined.
    async fn pending_nonce(&self, signer: &Address) -> Result<u64, ChainError>;

    /// Dry-run `request` against current state without a nonce check.
    async fn simulate(&self, request: &TransactionRequest) -> Result<(), ChainError>;

    async fn submit(&self, request: TransactionRequest) -> Result<TxHash, ChainError>;

    /// Wait at most `timeout`; expiry yields [`ChainError::ReceiptTimeout`].
    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError>;

    fn subscribe(&self) -> broadcast::Receiver<GameEvent>;
}
