use serde::{Deserialize, Serialize};

use crate::chain::{GameId, TxHash};
use crate::resolution::{outcome_from_difference, GameOutcome};

use super::{GameProcessingState, GameStep, OrchestrationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Completed,
    /// Another request is working on this game.
    InProgress,
    /// A transaction was sent and its receipt has not arrived yet.
    Pending,
    /// Nothing in flight.
    Idle,
    Failed,
}

/// What a request handler returns to its caller. Errors never cross this boundary
/// as anything other than `success: false`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResponse {
    pub success: bool,
    pub game_id: GameId,
    pub status: ResolutionStatus,
    pub step: Option<GameStep>,
    pub result: Option<u8>,
    pub outcome: Option<GameOutcome>,
    pub tx_hash: Option<TxHash>,
    pub error: Option<String>,
    pub error_kind: Option<String>,
}

impl ResolutionResponse {
    pub fn completed(state: &GameProcessingState) -> Self {
        Self {
            success: true,
            game_id: state.game_id,
            status: ResolutionStatus::Completed,
            step: Some(GameStep::Done),
            result: state.result,
            outcome: state.result.map(|r| outcome_from_difference(r as i64)),
            tx_hash: state.tx_hash.clone(),
            error: None,
            error_kind: None,
        }
    }

    pub fn snapshot(state: &GameProcessingState, status: ResolutionStatus) -> Self {
        Self {
            success: true,
            game_id: state.game_id,
            status,
            step: Some(state.step),
            result: state.result,
            outcome: None,
            tx_hash: state.tx_hash.clone(),
            error: None,
            error_kind: None,
        }
    }

    pub fn idle(game_id: GameId, step: GameStep) -> Self {
        Self {
            success: true,
            game_id,
            status: ResolutionStatus::Idle,
            step: Some(step),
            result: None,
            outcome: None,
            tx_hash: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(game_id: GameId, err: &OrchestrationError) -> Self {
        Self {
            success: false,
            game_id,
            status: ResolutionStatus::Failed,
            step: None,
            result: None,
            outcome: None,
            tx_hash: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
        }
    }
}
