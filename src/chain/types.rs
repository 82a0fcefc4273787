use std::fmt;

use serde::{Deserialize, Serialize};

pub type GameId = u64;

/// Hex account address.
pub type Address = String;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-chain view of one game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: GameId,
    pub player: Address,
    pub house: Option<Address>,
    pub bet: u128,
    #[serde(with = "crate::crypto_serde::bytes_hex")]
    pub player_commitment: Vec<u8>,
    #[serde(with = "crate::crypto_serde::option_bytes_hex")]
    pub player_move: Option<Vec<u8>>,
    #[serde(with = "crate::crypto_serde::option_bytes_hex")]
    pub house_move: Option<Vec<u8>>,
    pub both_committed: bool,
    #[serde(with = "crate::crypto_serde::option_bytes_hex")]
    pub encrypted_difference: Option<Vec<u8>>,
    #[serde(with = "crate::crypto_serde::option_bytes_hex")]
    pub difference_commitment: Option<Vec<u8>>,
    pub revealed_difference: Option<u8>,
    pub finished: bool,
    pub winner: Option<Address>,
}

/// Contract entry points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum GameCall {
    CreateGame {
        bet: u128,
        #[serde(with = "crate::crypto_serde::bytes_hex")]
        commitment: Vec<u8>,
    },
    JoinGame {
        game_id: GameId,
    },
    SubmitMoves {
        game_id: GameId,
        #[serde(with = "crate::crypto_serde::bytes_hex")]
        player_move: Vec<u8>,
        #[serde(with = "crate::crypto_serde::bytes_hex")]
        house_move: Vec<u8>,
    },
    SubmitDifference {
        game_id: GameId,
        #[serde(with = "crate::crypto_serde::bytes_hex")]
        encrypted_difference: Vec<u8>,
        #[serde(with = "crate::crypto_serde::bytes_hex")]
        commitment: Vec<u8>,
    },
    FinalizeGame {
        game_id: GameId,
        diff_mod3: u8,
    },
}

impl GameCall {
    pub fn method(&self) -> &'static str {
        match self {
            GameCall::CreateGame { .. } => "create_game",
            GameCall::JoinGame { .. } => "join_game",
            GameCall::SubmitMoves { .. } => "submit_moves",
            GameCall::SubmitDifference { .. } => "submit_difference",
            GameCall::FinalizeGame { .. } => "finalize_game",
        }
    }

    pub fn game_id(&self) -> Option<GameId> {
        match self {
            GameCall::CreateGame { .. } => None,
            GameCall::JoinGame { game_id }
            | GameCall::SubmitMoves { game_id, .. }
            | GameCall::SubmitDifference { game_id, .. }
            | GameCall::FinalizeGame { game_id, .. } => Some(*game_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub nonce: u64,
    pub call: GameCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub revert_reason: Option<String>,
    /// Set for `CreateGame`.
    pub game_id: Option<GameId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameCreated {
        game_id: GameId,
        player: Address,
        bet: u128,
    },
    GameJoined {
        game_id: GameId,
        house: Address,
    },
    MovesSubmitted {
        game_id: GameId,
    },
    DifferenceSubmitted {
        game_id: GameId,
    },
    GameResolved {
        game_id: GameId,
        diff_mod3: u8,
        winner: Option<Address>,
    },
}

impl GameEvent {
    pub fn game_id(&self) -> GameId {
        match self {
            GameEvent::GameCreated { game_id, .. }
            | GameEvent::GameJoined { game_id, .. }
            | GameEvent::MovesSubmitted { game_id }
            | GameEvent::DifferenceSubmitted { game_id }
            | GameEvent::GameResolved { game_id, .. } => *game_id,
        }
    }
}
