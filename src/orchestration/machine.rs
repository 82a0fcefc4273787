use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::cache::GameStateCache;
use crate::chain::{
    ChainClient, ChainError, GameCall, GameEvent, GameId, GameInfo, TransactionRequest, TxHash,
};
use crate::config::OrchestratorConfig;
use crate::nonce::{NonceSequencer, SignerPool};
use crate::resolution::{diff_mod3, move_commitment, EncodedMoveScheme};
use crate::retry::retry_with_backoff;

use super::{
    GameProcessingState, GameStep, HouseStrategy, OrchestrationError, ProcessingStatus,
    ResolutionResponse, ResolutionStatus,
};

const LOG_TARGET: &str = "rps::orchestration";

/// A player's request to settle a game. `player_move` is the encoded
/// ciphertext whose hash the player committed to when creating the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub game_id: GameId,
    #[serde(with = "crate::crypto_serde::bytes_hex")]
    pub player_move: Vec<u8>,
}

enum StepOutcome {
    Advanced,
    Pending(TxHash),
}

enum ReceiptOutcome {
    Confirmed,
    Pending,
}

pub struct GameOrchestrator {
    scheme: Arc<dyn EncodedMoveScheme>,
    chain: Arc<dyn ChainClient>,
    cache: Arc<dyn GameStateCache>,
    signers: SignerPool,
    house: Arc<dyn HouseStrategy>,
    config: OrchestratorConfig,
}

impl GameOrchestrator {
    pub fn new(
        scheme: Arc<dyn EncodedMoveScheme>,
        chain: Arc<dyn ChainClient>,
        cache: Arc<dyn GameStateCache>,
        signers: SignerPool,
        house: Arc<dyn HouseStrategy>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            scheme,
            chain,
            cache,
            signers,
            house,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.chain.subscribe()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the game as far as it can go right now.
    ///
    /// Safe to call repeatedly: a finished game returns its cached result, a
    /// game being processed elsewhere returns a snapshot, and a transaction
    /// whose receipt timed out is awaited again rather than resubmitted.
    #[tracing::instrument(target = LOG_TARGET, skip(self, request), fields(game_id = request.game_id))]
    pub async fn resolve(&self, request: ResolveRequest) -> ResolutionResponse {
        let game_id = request.game_id;
        match self.drive(&request).await {
            Ok(response) => response,
            Err(err) => self.fail(game_id, err).await,
        }
    }

    /// Join as the house without a move; the move is chosen at submission time.
    #[tracing::instrument(target = LOG_TARGET, skip(self))]
    pub async fn join_game(&self, game_id: GameId) -> ResolutionResponse {
        match self.try_join(game_id).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(target: LOG_TARGET, game_id, kind = err.kind(), error = %err, "join failed");
                ResolutionResponse::failed(game_id, &err)
            }
        }
    }

    /// Cached progress if any, otherwise what the chain says.
    pub async fn status(&self, game_id: GameId) -> ResolutionResponse {
        match self.try_status(game_id).await {
            Ok(response) => response,
            Err(err) => ResolutionResponse::failed(game_id, &err),
        }
    }

    async fn try_status(&self, game_id: GameId) -> Result<ResolutionResponse, OrchestrationError> {
        if let Some(cached) = self.cache.get(game_id).await? {
            match cached.status {
                ProcessingStatus::Completed => return Ok(ResolutionResponse::completed(&cached)),
                _ if cached.is_stale(Utc::now(), self.config.cache_ttl) => {}
                _ if cached.awaiting_receipt => {
                    return Ok(ResolutionResponse::snapshot(&cached, ResolutionStatus::Pending))
                }
                _ => return Ok(ResolutionResponse::snapshot(&cached, ResolutionStatus::InProgress)),
            }
        }

        let info = self.read_game(game_id).await?;
        match (GameStep::derive(&info), info.revealed_difference) {
            (GameStep::Done, Some(result)) => {
                let mut state = GameProcessingState::new(game_id, GameStep::Done);
                state.complete(result);
                Ok(ResolutionResponse::completed(&state))
            }
            (step, _) => Ok(ResolutionResponse::idle(game_id, step)),
        }
    }

    async fn try_join(&self, game_id: GameId) -> Result<ResolutionResponse, OrchestrationError> {
        if let Some(cached) = self.cache.get(game_id).await? {
            if let Some(response) = self.resume_join(cached).await? {
                return Ok(response);
            }
        }

        let info = self.read_game(game_id).await?;
        let step = GameStep::derive(&info);
        if step != GameStep::Joining {
            tracing::debug!(target: LOG_TARGET, game_id, %step, "game already joined");
            return Ok(ResolutionResponse::idle(game_id, step));
        }

        let mut state = GameProcessingState::new(game_id, GameStep::Joining);
        match self.execute(&mut state, GameCall::JoinGame { game_id }).await? {
            StepOutcome::Pending(_) => Ok(ResolutionResponse::snapshot(&state, ResolutionStatus::Pending)),
            StepOutcome::Advanced => {
                // Joining alone must not look like an in-flight resolution
                self.cache.delete(game_id).await?;
                tracing::info!(target: LOG_TARGET, game_id, "joined game as house");
                Ok(ResolutionResponse::idle(game_id, GameStep::SubmittingMoves))
            }
        }
    }

    /// A join whose receipt timed out is awaited again, never resubmitted.
    /// `None` means the chain decides what happens next.
    async fn resume_join(
        &self,
        cached: GameProcessingState,
    ) -> Result<Option<ResolutionResponse>, OrchestrationError> {
        let game_id = cached.game_id;
        if cached.step != GameStep::Joining
            || !cached.awaiting_receipt
            || cached.is_stale(Utc::now(), self.config.cache_ttl)
        {
            return Ok(None);
        }
        let Some(tx_hash) = cached.tx_hash.clone() else {
            return Ok(None);
        };

        tracing::info!(target: LOG_TARGET, game_id, tx_hash = %tx_hash, "waiting on recorded join transaction");
        match self.await_receipt(game_id, &tx_hash).await {
            Ok(ReceiptOutcome::Pending) => {
                Ok(Some(ResolutionResponse::snapshot(&cached, ResolutionStatus::Pending)))
            }
            Ok(ReceiptOutcome::Confirmed) => {
                self.cache.delete(game_id).await?;
                Ok(None)
            }
            Err(err) => {
                self.cache.delete(game_id).await?;
                Err(err)
            }
        }
    }

    async fn drive(&self, request: &ResolveRequest) -> Result<ResolutionResponse, OrchestrationError> {
        let game_id = request.game_id;

        let mut resumed = match self.cache.get(game_id).await? {
            Some(cached) if cached.status == ProcessingStatus::Completed => {
                tracing::info!(target: LOG_TARGET, game_id, "returning cached result");
                return Ok(ResolutionResponse::completed(&cached));
            }
            Some(cached) if cached.is_stale(Utc::now(), self.config.cache_ttl) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    game_id,
                    step = %cached.step,
                    updated_at = %cached.updated_at,
                    "evicting stale processing state"
                );
                self.cache.delete(game_id).await?;
                None
            }
            Some(cached) if cached.awaiting_receipt => Some(cached),
            Some(cached) => {
                tracing::debug!(target: LOG_TARGET, game_id, step = %cached.step, "game is being processed");
                return Ok(ResolutionResponse::snapshot(&cached, ResolutionStatus::InProgress));
            }
            None => None,
        };

        if let Some(state) = resumed.as_mut() {
            if let Some(tx_hash) = state.tx_hash.clone() {
                tracing::info!(target: LOG_TARGET, game_id, tx_hash = %tx_hash, "waiting on recorded transaction");
                match self.await_receipt(game_id, &tx_hash).await? {
                    ReceiptOutcome::Pending => {
                        return Ok(ResolutionResponse::snapshot(state, ResolutionStatus::Pending));
                    }
                    ReceiptOutcome::Confirmed => state.awaiting_receipt = false,
                }
            } else {
                state.awaiting_receipt = false;
            }
        }

        let mut info = self.read_game(game_id).await?;
        let mut state = resumed.unwrap_or_else(|| GameProcessingState::new(game_id, GameStep::derive(&info)));
        state.status = ProcessingStatus::Processing;

        loop {
            let step = GameStep::derive(&info);
            state.step = step;
            tracing::debug!(target: LOG_TARGET, game_id, %step, "running step");

            let outcome = match step {
                GameStep::Done => return self.finish(&mut state, &info).await,
                GameStep::Joining => {
                    self.store(&mut state).await?;
                    self.execute(&mut state, GameCall::JoinGame { game_id }).await?
                }
                GameStep::SubmittingMoves => {
                    let call = self.moves_call(request, &info)?;
                    self.store(&mut state).await?;
                    self.execute(&mut state, call).await?
                }
                GameStep::ComputingDifference => {
                    let call = self.difference_call(&info)?;
                    self.store(&mut state).await?;
                    self.execute(&mut state, call).await?
                }
                GameStep::Finalizing => {
                    let diff_mod3 = self.decrypt_result(&info)?;
                    state.result = Some(diff_mod3);
                    self.store(&mut state).await?;
                    self.execute(&mut state, GameCall::FinalizeGame { game_id, diff_mod3 })
                        .await?
                }
            };

            if let StepOutcome::Pending(tx_hash) = outcome {
                tracing::warn!(
                    target: LOG_TARGET,
                    game_id,
                    %step,
                    tx_hash = %tx_hash,
                    "receipt not available yet; reporting pending"
                );
                return Ok(ResolutionResponse::snapshot(&state, ResolutionStatus::Pending));
            }

            let next = self.read_game(game_id).await?;
            if GameStep::derive(&next) <= step {
                return Err(OrchestrationError::NoProgress { game_id, step });
            }
            info = next;
        }
    }

    async fn finish(
        &self,
        state: &mut GameProcessingState,
        info: &GameInfo,
    ) -> Result<ResolutionResponse, OrchestrationError> {
        let result = info
            .revealed_difference
            .or(state.result)
            .ok_or(OrchestrationError::MissingOnChainData {
                game_id: info.game_id,
                field: "revealed_difference",
            })?;
        state.complete(result);
        self.cache.set(state, self.config.cache_ttl).await?;

        let response = ResolutionResponse::completed(state);
        tracing::info!(
            target: LOG_TARGET,
            game_id = state.game_id,
            diff_mod3 = result,
            outcome = ?response.outcome,
            "game resolved"
        );
        Ok(response)
    }

    async fn fail(&self, game_id: GameId, err: OrchestrationError) -> ResolutionResponse {
        tracing::error!(
            target: LOG_TARGET,
            game_id,
            kind = err.kind(),
            error = %err,
            "resolution failed; evicting processing state"
        );
        if let Err(cache_err) = self.cache.delete(game_id).await {
            tracing::warn!(target: LOG_TARGET, game_id, error = %cache_err, "failed to evict processing state");
        }
        ResolutionResponse::failed(game_id, &err)
    }

    async fn store(&self, state: &mut GameProcessingState) -> Result<(), OrchestrationError> {
        state.touch();
        self.cache.set(state, self.config.cache_ttl).await?;
        Ok(())
    }

    async fn read_game(&self, game_id: GameId) -> Result<GameInfo, OrchestrationError> {
        let info = retry_with_backoff(&self.config.read_retry, "game_info", |_| {
            self.chain.game_info(game_id)
        })
        .await?;
        Ok(info)
    }

    fn moves_call(&self, request: &ResolveRequest, info: &GameInfo) -> Result<GameCall, OrchestrationError> {
        let game_id = request.game_id;
        if move_commitment(&request.player_move).as_slice() != info.player_commitment.as_slice() {
            return Err(OrchestrationError::CommitmentMismatch { game_id });
        }
        self.scheme.validate_encoded(&request.player_move)?;

        let house_move = self.house.choose_move(game_id);
        let encrypted = self.scheme.encrypt_move_encoded(house_move)?;
        Ok(GameCall::SubmitMoves {
            game_id,
            player_move: request.player_move.clone(),
            house_move: encrypted,
        })
    }

    fn difference_call(&self, info: &GameInfo) -> Result<GameCall, OrchestrationError> {
        let game_id = info.game_id;
        let player = info
            .player_move
            .as_deref()
            .ok_or(OrchestrationError::MissingOnChainData { game_id, field: "player_move" })?;
        let house = info
            .house_move
            .as_deref()
            .ok_or(OrchestrationError::MissingOnChainData { game_id, field: "house_move" })?;

        let encrypted_difference = self.scheme.difference_encoded(player, house)?;
        let commitment = move_commitment(&encrypted_difference).to_vec();
        Ok(GameCall::SubmitDifference {
            game_id,
            encrypted_difference,
            commitment,
        })
    }

    /// Decrypt the on-chain difference; nothing else is ever decrypted.
    fn decrypt_result(&self, info: &GameInfo) -> Result<u8, OrchestrationError> {
        let game_id = info.game_id;
        let difference = info
            .encrypted_difference
            .as_deref()
            .ok_or(OrchestrationError::MissingOnChainData { game_id, field: "encrypted_difference" })?;
        if let Some(commitment) = &info.difference_commitment {
            if move_commitment(difference).as_slice() != commitment.as_slice() {
                return Err(OrchestrationError::CommitmentMismatch { game_id });
            }
        }
        let diff = self.scheme.decrypt_difference_encoded(difference)?;
        Ok(diff_mod3(diff))
    }

    /// Submit `call` under the write budget and wait for its receipt.
    async fn execute(
        &self,
        state: &mut GameProcessingState,
        call: GameCall,
    ) -> Result<StepOutcome, OrchestrationError> {
        let game_id = state.game_id;
        let signer = self.signers.next();
        let attempts = AtomicU32::new(0);

        let submitted = retry_with_backoff(&self.config.write_retry, call.method(), |_| {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.submit_once(signer, &call)
        })
        .await;
        state.retry_count += attempts.load(Ordering::Relaxed).saturating_sub(1);

        let tx_hash = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(err) if err.is_already_done() => {
                tracing::info!(
                    target: LOG_TARGET,
                    game_id,
                    method = call.method(),
                    error = %err,
                    "step already completed on-chain"
                );
                return Ok(StepOutcome::Advanced);
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            target: LOG_TARGET,
            game_id,
            method = call.method(),
            signer = %signer.signer(),
            tx_hash = %tx_hash,
            "submitted transaction"
        );
        state.tx_hash = Some(tx_hash.clone());
        state.awaiting_receipt = true;
        self.store(state).await?;

        match self.await_receipt(game_id, &tx_hash).await? {
            ReceiptOutcome::Pending => Ok(StepOutcome::Pending(tx_hash)),
            ReceiptOutcome::Confirmed => {
                state.awaiting_receipt = false;
                Ok(StepOutcome::Advanced)
            }
        }
    }

    async fn submit_once(
        &self,
        signer: &NonceSequencer,
        call: &GameCall,
    ) -> Result<TxHash, OrchestrationError> {
        let mut request = TransactionRequest {
            from: signer.signer().clone(),
            nonce: 0,
            call: call.clone(),
        };
        self.chain.simulate(&request).await?;

        request.nonce = signer.reserve().await?;
        match self.chain.submit(request).await {
            Ok(tx_hash) => Ok(tx_hash),
            Err(err) => {
                // The reserved nonce may or may not have been consumed
                if let Err(nonce_err) = signer.invalidate().await {
                    tracing::warn!(target: LOG_TARGET, error = %nonce_err, "failed to invalidate nonce");
                }
                Err(err.into())
            }
        }
    }

    async fn await_receipt(
        &self,
        game_id: GameId,
        tx_hash: &TxHash,
    ) -> Result<ReceiptOutcome, OrchestrationError> {
        match self
            .chain
            .wait_for_receipt(tx_hash, self.config.receipt_timeout)
            .await
        {
            Ok(receipt) if receipt.success => Ok(ReceiptOutcome::Confirmed),
            Ok(receipt) => {
                let reason = receipt
                    .revert_reason
                    .unwrap_or_else(|| "execution reverted".to_string());
                let err = ChainError::classify(reason);
                if err.is_already_done() {
                    tracing::info!(target: LOG_TARGET, game_id, tx_hash = %tx_hash, error = %err, "transaction reverted as already done");
                    Ok(ReceiptOutcome::Confirmed)
                } else {
                    Err(err.into())
                }
            }
            Err(ChainError::ReceiptTimeout(_)) => Ok(ReceiptOutcome::Pending),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainOp;
    use crate::resolution::{ElGamalMoveScheme, GameOutcome, Move};
    use crate::test_utils::fixtures;
    use crate::test_utils::harness::Harness;

    fn request(game_id: GameId, player_move: &[u8]) -> ResolveRequest {
        ResolveRequest {
            game_id,
            player_move: player_move.to_vec(),
        }
    }

    fn assert_each_step_mined_once(h: &Harness) {
        for method in ["join_game", "submit_moves", "submit_difference", "finalize_game"] {
            assert_eq!(h.chain.count_mined(method), 1, "{method}");
        }
    }

    #[tokio::test]
    async fn elgamal_game_resolves_to_player_win() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Paper).await;

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert!(response.success, "{response:?}");
        assert_eq!(response.status, ResolutionStatus::Completed);
        assert_eq!(response.result, Some(1));
        assert_eq!(response.outcome, Some(GameOutcome::Win));

        let info = h.chain.game_info(game_id).await.unwrap();
        assert!(info.finished);
        assert_eq!(info.revealed_difference, Some(1));
        assert_eq!(info.winner.as_deref(), Some("0xplayer"));
        assert_each_step_mined_once(&h);
    }

    #[tokio::test]
    async fn paillier_game_resolves_to_player_loss() {
        let h = Harness::paillier(Move::Scissors);
        let (game_id, player_move) = h.create_game(Move::Paper).await;

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.status, ResolutionStatus::Completed, "{response:?}");
        assert_eq!(response.result, Some(2));
        assert_eq!(response.outcome, Some(GameOutcome::Lose));
        assert_each_step_mined_once(&h);
    }

    #[tokio::test]
    async fn repeated_resolution_returns_the_same_result() {
        let h = Harness::elgamal(Move::Paper);
        let (game_id, player_move) = h.create_game(Move::Paper).await;

        let first = h.orchestrator.resolve(request(game_id, &player_move)).await;
        let second = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(first.outcome, Some(GameOutcome::Draw));
        assert_eq!(second.result, first.result);

        // Without the cache the chain still answers
        h.cache.delete(game_id).await.unwrap();
        let third = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(third.status, ResolutionStatus::Completed);
        assert_eq!(third.result, Some(0));
        assert_each_step_mined_once(&h);
    }

    #[tokio::test]
    async fn fresh_processing_entry_reports_in_progress() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Rock).await;
        let state = GameProcessingState::new(game_id, GameStep::SubmittingMoves);
        h.cache.set(&state, h.orchestrator.config().cache_ttl).await.unwrap();

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.status, ResolutionStatus::InProgress);
        assert_eq!(response.step, Some(GameStep::SubmittingMoves));
        assert_eq!(h.chain.count_mined("join_game"), 0);
    }

    #[tokio::test]
    async fn stale_processing_entry_is_evicted() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Scissors).await;
        let mut state = GameProcessingState::new(game_id, GameStep::Joining);
        state.updated_at = Utc::now() - chrono::Duration::minutes(5);
        h.cache.set(&state, h.orchestrator.config().cache_ttl).await.unwrap();

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.status, ResolutionStatus::Completed, "{response:?}");
        // Scissors - Rock = 2
        assert_eq!(response.outcome, Some(GameOutcome::Lose));
    }

    #[tokio::test(start_paused = true)]
    async fn receipt_timeout_reports_pending_without_resubmitting() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Paper).await;
        h.chain.pause_mining();

        let pending = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(pending.status, ResolutionStatus::Pending, "{pending:?}");
        assert_eq!(pending.step, Some(GameStep::Joining));
        assert!(pending.tx_hash.is_some());
        let cached = h.cache.get(game_id).await.unwrap().unwrap();
        assert!(cached.awaiting_receipt);

        let again = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(again.status, ResolutionStatus::Pending);
        assert_eq!(again.tx_hash, pending.tx_hash);
        assert_eq!(h.chain.mempool_len(), 1);

        h.chain.resume_mining();
        let done = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(done.outcome, Some(GameOutcome::Win), "{done:?}");
        assert_each_step_mined_once(&h);
    }

    #[tokio::test]
    async fn error_after_broadcast_is_reconciled_with_chain_state() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Rock).await;
        h.chain
            .script_failure(ChainOp::SubmitAfterBroadcast, "ECONNRESET: connection reset by peer");

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.status, ResolutionStatus::Completed, "{response:?}");
        assert_eq!(response.outcome, Some(GameOutcome::Draw));
        assert_each_step_mined_once(&h);
    }

    #[tokio::test]
    async fn nonce_conflict_is_retried() {
        let h = Harness::elgamal(Move::Paper);
        let (game_id, player_move) = h.create_game(Move::Scissors).await;
        h.chain.script_failure(ChainOp::Submit, "nonce too low");

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.outcome, Some(GameOutcome::Win), "{response:?}");
        let cached = h.cache.get(game_id).await.unwrap().unwrap();
        assert_eq!(cached.retry_count, 1);
        assert_eq!(cached.status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn mismatched_move_is_rejected_and_state_evicted() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, _) = h.create_game(Move::Rock).await;
        let forged = h.scheme.encrypt_move_encoded(Move::Paper).unwrap();

        let response = h.orchestrator.resolve(request(game_id, &forged)).await;
        assert!(!response.success);
        assert_eq!(response.status, ResolutionStatus::Failed);
        assert_eq!(response.error_kind.as_deref(), Some("commitment_mismatch"));
        assert!(h.cache.get(game_id).await.unwrap().is_none());
        assert_eq!(h.chain.count_mined("submit_moves"), 0);
    }

    #[tokio::test]
    async fn user_rejection_is_distinguishable() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Rock).await;
        h.chain
            .script_failure(ChainOp::Simulate, "User denied transaction signature");

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.error_kind.as_deref(), Some("user_rejected"));
        assert!(h.chain.game_info(game_id).await.unwrap().house.is_none());
    }

    #[tokio::test]
    async fn missing_private_key_stops_before_finalizing() {
        let (public, _) = fixtures::elgamal_keypair(7);
        let scheme = ElGamalMoveScheme::public_only(public).unwrap();
        let h = Harness::with_scheme(Arc::new(scheme), Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Paper).await;

        let response = h.orchestrator.resolve(request(game_id, &player_move)).await;
        assert_eq!(response.error_kind.as_deref(), Some("resolution"));
        let info = h.chain.game_info(game_id).await.unwrap();
        assert!(info.encrypted_difference.is_some());
        assert!(!info.finished);
    }

    #[tokio::test]
    async fn unknown_game_fails_cleanly() {
        let h = Harness::elgamal(Move::Rock);
        let response = h.orchestrator.resolve(request(404, b"nothing")).await;
        assert_eq!(response.error_kind.as_deref(), Some("game_not_found"));
    }

    #[tokio::test]
    async fn status_tracks_the_game() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, player_move) = h.create_game(Move::Paper).await;

        let before = h.orchestrator.status(game_id).await;
        assert_eq!(before.status, ResolutionStatus::Idle);
        assert_eq!(before.step, Some(GameStep::Joining));

        h.orchestrator.resolve(request(game_id, &player_move)).await;
        h.cache.delete(game_id).await.unwrap();
        let after = h.orchestrator.status(game_id).await;
        assert_eq!(after.status, ResolutionStatus::Completed);
        assert_eq!(after.outcome, Some(GameOutcome::Win));
    }

    #[tokio::test]
    async fn join_game_joins_once_and_leaves_no_processing_state() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, _) = h.create_game(Move::Rock).await;

        let first = h.orchestrator.join_game(game_id).await;
        assert_eq!(first.status, ResolutionStatus::Idle, "{first:?}");
        assert_eq!(first.step, Some(GameStep::SubmittingMoves));
        let second = h.orchestrator.join_game(game_id).await;
        assert_eq!(second.step, Some(GameStep::SubmittingMoves));

        assert_eq!(h.chain.count_mined("join_game"), 1);
        assert!(h.cache.get(game_id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn join_after_receipt_timeout_waits_on_the_recorded_transaction() {
        let h = Harness::elgamal(Move::Rock);
        let (game_id, _) = h.create_game(Move::Paper).await;
        h.chain.pause_mining();

        let first = h.orchestrator.join_game(game_id).await;
        assert_eq!(first.status, ResolutionStatus::Pending, "{first:?}");
        assert!(first.tx_hash.is_some());

        let second = h.orchestrator.join_game(game_id).await;
        assert_eq!(second.status, ResolutionStatus::Pending, "{second:?}");
        assert_eq!(second.tx_hash, first.tx_hash);
        assert_eq!(h.chain.mempool_len(), 1);

        h.chain.resume_mining();
        let joined = h.orchestrator.join_game(game_id).await;
        assert_eq!(joined.status, ResolutionStatus::Idle, "{joined:?}");
        assert_eq!(joined.step, Some(GameStep::SubmittingMoves));
        assert_eq!(h.chain.count_mined("join_game"), 1);
        assert!(h.cache.get(game_id).await.unwrap().is_none());
    }

    #[test]
    fn request_uses_hex_moves() {
        let json = serde_json::to_value(request(3, &[0xab, 0xcd])).unwrap();
        assert_eq!(json["player_move"], "0xabcd");
    }
}
