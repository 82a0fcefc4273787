//! Additively homomorphic ElGamal over an elliptic curve.
//!
//! Plaintexts are small integers encoded as `m·G`; decryption recovers `m`
//! by searching an explicit candidate domain rather than solving a general
//! discrete logarithm.

mod ciphertext;
mod domain;
mod keys;
mod scheme;

pub use ciphertext::ElGamalCiphertext;
pub use domain::{DecryptionDomain, DecryptionTable};
pub use keys::{generate_keypair, generate_keypair_with_rng, ElGamalPrivateKey, ElGamalPublicKey};
pub use scheme::{
    decrypt, decrypt_in_domain, encrypt, encrypt_with_randomness, encrypt_with_rng,
    homomorphic_addition, homomorphic_difference, negate, rerandomize, scalar_addition,
    scalar_subtraction,
};

use thiserror::Error;

use crate::curve::CurveError;
use crate::modular::ArithmeticError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElGamalError {
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),

    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("discrete logarithm not found in the decryption domain")]
    DiscreteLogNotFound,

    #[error("invalid ciphertext encoding: expected {expected} bytes, got {actual}")]
    InvalidCiphertextLength { expected: usize, actual: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
