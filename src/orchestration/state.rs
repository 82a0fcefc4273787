use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{GameId, GameInfo, TxHash};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Processing,
    Completed,
}

/// Lifecycle steps in the order they must run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStep {
    Joining,
    SubmittingMoves,
    ComputingDifference,
    Finalizing,
    Done,
}

impl GameStep {
    /// First step not yet reflected in on-chain state.
    pub fn derive(info: &GameInfo) -> Self {
        if info.finished {
            GameStep::Done
        } else if info.house.is_none() {
            GameStep::Joining
        } else if !info.both_committed {
            GameStep::SubmittingMoves
        } else if info.encrypted_difference.is_none() {
            GameStep::ComputingDifference
        } else {
            GameStep::Finalizing
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStep::Joining => "joining",
            GameStep::SubmittingMoves => "submitting_moves",
            GameStep::ComputingDifference => "computing_difference",
            GameStep::Finalizing => "finalizing",
            GameStep::Done => "done",
        }
    }
}

impl fmt::Display for GameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached progress record for one game, stored under `game:{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProcessingState {
    pub game_id: GameId,
    pub status: ProcessingStatus,
    pub step: GameStep,
    pub result: Option<u8>,
    pub updated_at: DateTime<Utc>,
    pub tx_hash: Option<TxHash>,
    pub retry_count: u32,
    pub awaiting_receipt: bool,
}

impl GameProcessingState {
    pub fn new(game_id: GameId, step: GameStep) -> Self {
        Self {
            game_id,
            status: ProcessingStatus::Processing,
            step,
            result: None,
            updated_at: Utc::now(),
            tx_hash: None,
            retry_count: 0,
            awaiting_receipt: false,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// A processing entry untouched for longer than `ttl` no longer guards the game.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.status == ProcessingStatus::Completed {
            return false;
        }
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.updated_at) > ttl,
            Err(_) => false,
        }
    }

    pub fn complete(&mut self, result: u8) {
        self.status = ProcessingStatus::Completed;
        self.step = GameStep::Done;
        self.result = Some(result);
        self.awaiting_receipt = false;
        self.touch();
    }
}
