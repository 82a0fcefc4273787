//! Homomorphic difference protocol.
//!
//! Two encrypted moves are combined into an encryption of `player - house`.
//! Only that difference is ever decrypted, and its residue mod 3 decides the game.

mod moves;
mod protocol;
mod scheme;

pub use moves::{diff_mod3, outcome_from_difference, GameOutcome, Move};
pub use protocol::{move_commitment, resolve, Resolution};
pub use scheme::{ElGamalMoveScheme, EncodedMoveScheme, HomomorphicMoveScheme, PaillierMoveScheme};

use thiserror::Error;

use crate::elgamal::ElGamalError;
use crate::paillier::PaillierError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("elgamal: {0}")]
    ElGamal(#[from] ElGamalError),

    #[error("paillier: {0}")]
    Paillier(#[from] PaillierError),

    #[error("decryption requires the private key")]
    MissingPrivateKey,

    #[error("decrypted difference {0} is not a valid move difference")]
    DifferenceOutOfRange(String),

    #[error("invalid move code {0}")]
    InvalidMove(u8),
}
