//! Rock-paper-scissors resolved over homomorphically encrypted moves.
//!
//! Moves are encrypted under EC-ElGamal on BN254 or under Paillier. The
//! house combines both ciphertexts into an encryption of `player - house`
//! and only that difference is ever decrypted.

pub mod cache;
pub mod chain;
pub mod config;
pub mod crypto_serde;
pub mod curve;
pub mod elgamal;
pub mod modular;
pub mod nonce;
pub mod orchestration;
pub mod paillier;
pub mod resolution;
pub mod retry;
pub mod telemetry;
pub mod tokio_tools;

#[cfg(test)]
pub mod test_utils;
