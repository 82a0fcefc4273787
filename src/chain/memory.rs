use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use tokio::sync::{broadcast, Notify};

use crate::resolution::move_commitment;

use super::{
    Address, ChainClient, ChainError, GameCall, GameEvent, GameId, GameInfo, TransactionRequest,
    TxHash, TxReceipt,
};

const LOG_TARGET: &str = "rps::chain::memory";
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Operations a scripted failure can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainOp {
    GameInfo,
    PendingNonce,
    Simulate,
    /// Rejected before reaching the mempool.
    Submit,
    /// Accepted and mined, but the caller still sees an error.
    SubmitAfterBroadcast,
}

struct Inner {
    games: HashMap<GameId, GameInfo>,
    next_game_id: GameId,
    confirmed_nonces: HashMap<Address, u64>,
    mempool: VecDeque<(TxHash, TransactionRequest)>,
    receipts: HashMap<TxHash, TxReceipt>,
    block_number: u64,
    mining_paused: bool,
    failures: HashMap<ChainOp, VecDeque<String>>,
    mined: Vec<TransactionRequest>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            games: HashMap::new(),
            next_game_id: 1,
            confirmed_nonces: HashMap::new(),
            mempool: VecDeque::new(),
            receipts: HashMap::new(),
            block_number: 0,
            mining_paused: false,
            failures: HashMap::new(),
            mined: Vec::new(),
        }
    }
}

impl Inner {
    fn take_failure(&mut self, op: ChainOp) -> Option<String> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn pending_nonce(&self, signer: &Address) -> u64 {
        let confirmed = self.confirmed_nonces.get(signer).copied().unwrap_or(0);
        let queued = self.mempool.iter().filter(|(_, tx)| &tx.from == signer).count() as u64;
        confirmed + queued
    }

    /// Contract rules; the error string is the revert reason.
    fn check(&self, request: &TransactionRequest) -> Result<(), String> {
        let game = |game_id: &GameId| {
            self.games
                .get(game_id)
                .ok_or_else(|| format!("execution reverted: Game {game_id} does not exist"))
        };
        match &request.call {
            GameCall::CreateGame { commitment, .. } => {
                if commitment.len() != 32 {
                    return Err("execution reverted: Invalid commitment".into());
                }
            }
            GameCall::JoinGame { game_id } => {
                let info = game(game_id)?;
                if info.finished {
                    return Err("execution reverted: Game already finished".into());
                }
                if info.house.is_some() {
                    return Err("execution reverted: Game already joined".into());
                }
            }
            GameCall::SubmitMoves {
                game_id,
                player_move,
                ..
            } => {
                let info = game(game_id)?;
                if info.both_committed {
                    return Err("execution reverted: Moves already submitted".into());
                }
                if info.house.is_none() {
                    return Err("execution reverted: House has not joined".into());
                }
                if move_commitment(player_move).as_slice() != info.player_commitment.as_slice() {
                    return Err("execution reverted: Player move does not match commitment".into());
                }
            }
            GameCall::SubmitDifference {
                game_id,
                encrypted_difference,
                commitment,
            } => {
                let info = game(game_id)?;
                if info.encrypted_difference.is_some() {
                    return Err("execution reverted: Difference already computed".into());
                }
                if !info.both_committed {
                    return Err("execution reverted: Moves not submitted".into());
                }
                if move_commitment(encrypted_difference).as_slice() != commitment.as_slice() {
                    return Err("execution reverted: Difference commitment mismatch".into());
                }
            }
            GameCall::FinalizeGame { game_id, diff_mod3 } => {
                let info = game(game_id)?;
                if info.finished {
                    return Err("execution reverted: Game already finalized".into());
                }
                if info.encrypted_difference.is_none() {
                    return Err("execution reverted: Difference not computed".into());
                }
                if *diff_mod3 > 2 {
                    return Err("execution reverted: Invalid result".into());
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, request: &TransactionRequest) -> (Option<GameId>, GameEvent) {
        match &request.call {
            GameCall::CreateGame { bet, commitment } => {
                let game_id = self.next_game_id;
                self.next_game_id += 1;
                self.games.insert(
                    game_id,
                    GameInfo {
                        game_id,
                        player: request.from.clone(),
                        bet: *bet,
                        player_commitment: commitment.clone(),
                        ..GameInfo::default()
                    },
                );
                let event = GameEvent::GameCreated {
                    game_id,
                    player: request.from.clone(),
                    bet: *bet,
                };
                (Some(game_id), event)
            }
            GameCall::JoinGame { game_id } => {
                if let Some(info) = self.games.get_mut(game_id) {
                    info.house = Some(request.from.clone());
                }
                let event = GameEvent::GameJoined {
                    game_id: *game_id,
                    house: request.from.clone(),
                };
                (None, event)
            }
            GameCall::SubmitMoves {
                game_id,
                player_move,
                house_move,
            } => {
                if let Some(info) = self.games.get_mut(game_id) {
                    info.player_move = Some(player_move.clone());
                    info.house_move = Some(house_move.clone());
                    info.both_committed = true;
                }
                (None, GameEvent::MovesSubmitted { game_id: *game_id })
            }
            GameCall::SubmitDifference {
                game_id,
                encrypted_difference,
                commitment,
            } => {
                if let Some(info) = self.games.get_mut(game_id) {
                    info.encrypted_difference = Some(encrypted_difference.clone());
                    info.difference_commitment = Some(commitment.clone());
                }
                (None, GameEvent::DifferenceSubmitted { game_id: *game_id })
            }
            GameCall::FinalizeGame { game_id, diff_mod3 } => {
                let mut winner = None;
                if let Some(info) = self.games.get_mut(game_id) {
                    info.revealed_difference = Some(*diff_mod3);
                    info.finished = true;
                    winner = match diff_mod3 {
                        1 => Some(info.player.clone()),
                        2 => info.house.clone(),
                        _ => None,
                    };
                    info.winner = winner.clone();
                }
                let event = GameEvent::GameResolved {
                    game_id: *game_id,
                    diff_mod3: *diff_mod3,
                    winner,
                };
                (None, event)
            }
        }
    }
}

/// Rule-enforcing local chain with a mempool, nonce checks and scripted failures.
#[derive(Clone)]
pub struct InMemoryChain {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<GameEvent>,
    mined: Arc<Notify>,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            events,
            mined: Arc::new(Notify::new()),
        }
    }

    /// Queue a failure message for the next call of `op`. Messages are
    /// consumed in order, one per call.
    pub fn script_failure(&self, op: ChainOp, message: impl Into<String>) {
        self.inner
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    /// Hold submitted transactions in the mempool until [`resume_mining`](Self::resume_mining).
    pub fn pause_mining(&self) {
        self.inner.lock().mining_paused = true;
    }

    pub fn resume_mining(&self) {
        self.inner.lock().mining_paused = false;
        self.mine_pending();
    }

    /// Every mined transaction, in block order.
    pub fn mined_transactions(&self) -> Vec<TransactionRequest> {
        self.inner.lock().mined.clone()
    }

    /// How many mined transactions invoked `method`.
    pub fn count_mined(&self, method: &str) -> usize {
        self.inner
            .lock()
            .mined
            .iter()
            .filter(|tx| tx.call.method() == method)
            .count()
    }

    pub fn mempool_len(&self) -> usize {
        self.inner.lock().mempool.len()
    }

    fn mine_pending(&self) {
        let events = {
            let mut inner = self.inner.lock();
            let mut events = Vec::new();
            while let Some((tx_hash, request)) = inner.mempool.pop_front() {
                inner.block_number += 1;
                let block_number = inner.block_number;
                *inner.confirmed_nonces.entry(request.from.clone()).or_insert(0) += 1;

                let receipt = match inner.check(&request) {
                    Ok(()) => {
                        let (game_id, event) = inner.apply(&request);
                        events.push(event);
                        inner.mined.push(request);
                        TxReceipt {
                            tx_hash: tx_hash.clone(),
                            block_number,
                            success: true,
                            revert_reason: None,
                            game_id,
                        }
                    }
                    Err(reason) => TxReceipt {
                        tx_hash: tx_hash.clone(),
                        block_number,
                        success: false,
                        revert_reason: Some(reason),
                        game_id: None,
                    },
                };
                tracing::debug!(
                    target: LOG_TARGET,
                    tx_hash = %tx_hash,
                    block_number,
                    success = receipt.success,
                    "mined transaction"
                );
                inner.receipts.insert(tx_hash, receipt);
            }
            events
        };

        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        self.mined.notify_waiters();
    }
}

fn tx_hash_for(request: &TransactionRequest) -> TxHash {
    let mut hasher = Keccak256::new();
    hasher.update(request.from.as_bytes());
    hasher.update(request.nonce.to_be_bytes());
    hasher.update(request.call.method().as_bytes());
    TxHash(format!("0x{}", hex::encode(hasher.finalize())))
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn game_info(&self, game_id: GameId) -> Result<GameInfo, ChainError> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.take_failure(ChainOp::GameInfo) {
            return Err(ChainError::classify(message));
        }
        inner
            .games
            .get(&game_id)
            .cloned()
            .ok_or(ChainError::GameNotFound(game_id))
    }

    async fn pending_nonce(&self, signer: &Address) -> Result<u64, ChainError> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.take_failure(ChainOp::PendingNonce) {
            return Err(ChainError::classify(message));
        }
        Ok(inner.pending_nonce(signer))
    }

    async fn simulate(&self, request: &TransactionRequest) -> Result<(), ChainError> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.take_failure(ChainOp::Simulate) {
            return Err(ChainError::classify(message));
        }
        inner.check(request).map_err(ChainError::classify)
    }

    async fn submit(&self, request: TransactionRequest) -> Result<TxHash, ChainError> {
        let (tx_hash, late_failure, mine_now) = {
            let mut inner = self.inner.lock();
            if let Some(message) = inner.take_failure(ChainOp::Submit) {
                return Err(ChainError::classify(message));
            }

            let expected = inner.pending_nonce(&request.from);
            if request.nonce < expected {
                return Err(ChainError::classify(format!(
                    "nonce too low: next nonce {expected}, tx nonce {}",
                    request.nonce
                )));
            }
            if request.nonce > expected {
                return Err(ChainError::classify(format!(
                    "nonce too high: next nonce {expected}, tx nonce {}",
                    request.nonce
                )));
            }

            let tx_hash = tx_hash_for(&request);
            tracing::debug!(
                target: LOG_TARGET,
                tx_hash = %tx_hash,
                from = %request.from,
                nonce = request.nonce,
                method = request.call.method(),
                "accepted transaction"
            );
            inner.mempool.push_back((tx_hash.clone(), request));
            let late_failure = inner.take_failure(ChainOp::SubmitAfterBroadcast);
            (tx_hash, late_failure, !inner.mining_paused)
        };

        if mine_now {
            self.mine_pending();
        }
        match late_failure {
            Some(message) => Err(ChainError::classify(message)),
            None => Ok(tx_hash),
        }
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: &TxHash,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.mined.notified();
            {
                let inner = self.inner.lock();
                if let Some(receipt) = inner.receipts.get(tx_hash) {
                    return Ok(receipt.clone());
                }
                if !inner.mempool.iter().any(|(hash, _)| hash == tx_hash) {
                    return Err(ChainError::Reverted(format!("unknown transaction {tx_hash}")));
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(ChainError::ReceiptTimeout(tx_hash.clone()));
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }
}
