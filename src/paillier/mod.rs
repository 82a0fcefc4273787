//! Paillier encryption over `Z/n²Z`.
//!
//! Multiplying ciphertexts adds plaintexts and exponentiating a ciphertext
//! scales its plaintext, which is all the difference protocol needs.

mod keys;
mod proof;
mod scheme;

pub use keys::{generate_keypair, generate_keypair_with_rng, PaillierPrivateKey, PaillierPublicKey};
pub use proof::{generate_proof, generate_proof_with_rng, verify_proof, EncryptionProof};
pub use scheme::{
    add_encrypted, decrypt, decrypt_signed, encrypt, encrypt_signed, encrypt_with_randomness,
    encrypt_with_rng, multiply_by_constant, negate, rerandomize, subtract_encrypted,
    PaillierCiphertext,
};

use thiserror::Error;

use crate::modular::ArithmeticError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaillierError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("plaintext is outside [0, n)")]
    PlaintextOutOfRange,

    #[error("ciphertext is not a unit of Z/n²Z")]
    InvalidCiphertext,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid encoding: {0}")]
    Encoding(String),
}
