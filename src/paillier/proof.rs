//! Simplified proof of knowledge of the randomness behind a Paillier ciphertext.
//!
//! The prover shows it knows `r` with `c = g^m · r^n mod n²` for a public `m`.
//! This is a Schnorr-style sketch with a Fiat-Shamir challenge and does not
//! carry the soundness analysis of a production zero-knowledge system.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::modular::{mod_inverse, mod_pow, random_coprime_with_rng};

use super::scheme::PaillierCiphertext;
use super::{PaillierError, PaillierPublicKey};

const LOG_TARGET: &str = "rps::paillier::proof";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionProof {
    /// `a = s^n mod n²`
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    pub commitment: BigUint,
    /// `e = H(a ‖ c ‖ m) mod n`
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    pub challenge: BigUint,
    /// `z = s · r^e mod n`
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    pub response: BigUint,
}

pub fn generate_proof(
    m: &BigUint,
    r: &BigUint,
    ciphertext: &PaillierCiphertext,
    public: &PaillierPublicKey,
) -> Result<EncryptionProof, PaillierError> {
    generate_proof_with_rng(m, r, ciphertext, public, &mut OsRng)
}

pub fn generate_proof_with_rng<R: RngCore + CryptoRng>(
    m: &BigUint,
    r: &BigUint,
    ciphertext: &PaillierCiphertext,
    public: &PaillierPublicKey,
    rng: &mut R,
) -> Result<EncryptionProof, PaillierError> {
    let n = &public.n;
    let s = random_coprime_with_rng(n, rng)?;
    let commitment = mod_pow(&s, n, public.n_squared())?;
    let challenge = compute_challenge(&commitment, ciphertext, m, public);
    let response = s * mod_pow(r, &challenge, n)? % n;

    tracing::debug!(target: LOG_TARGET, "generated encryption proof");
    Ok(EncryptionProof {
        commitment,
        challenge,
        response,
    })
}

/// Check `z^n ≡ a · (c · g^-m)^e (mod n²)` under a recomputed challenge.
pub fn verify_proof(
    proof: &EncryptionProof,
    ciphertext: &PaillierCiphertext,
    m: &BigUint,
    public: &PaillierPublicKey,
) -> bool {
    match check(proof, ciphertext, m, public) {
        Ok(valid) => valid,
        Err(err) => {
            tracing::debug!(target: LOG_TARGET, error = %err, "proof verification failed");
            false
        }
    }
}

fn check(
    proof: &EncryptionProof,
    ciphertext: &PaillierCiphertext,
    m: &BigUint,
    public: &PaillierPublicKey,
) -> Result<bool, PaillierError> {
    ciphertext.validate(public)?;
    let n_squared = public.n_squared();

    let expected = compute_challenge(&proof.commitment, ciphertext, m, public);
    if expected != proof.challenge {
        tracing::debug!(target: LOG_TARGET, "challenge mismatch");
        return Ok(false);
    }

    let gm = mod_pow(&public.g, m, n_squared)?;
    let u = ciphertext.value() * mod_inverse(&gm, n_squared)? % n_squared;

    let lhs = mod_pow(&proof.response, &public.n, n_squared)?;
    let rhs = &proof.commitment * mod_pow(&u, &proof.challenge, n_squared)? % n_squared;
    Ok(lhs == rhs)
}

fn compute_challenge(
    commitment: &BigUint,
    ciphertext: &PaillierCiphertext,
    m: &BigUint,
    public: &PaillierPublicKey,
) -> BigUint {
    let width = public.ciphertext_bytes();
    let mut hasher = Keccak256::new();
    hasher.update(fixed_width(commitment, width));
    hasher.update(fixed_width(ciphertext.value(), width));
    hasher.update(m.to_bytes_be());
    BigUint::from_bytes_be(&hasher.finalize()) % &public.n
}

fn fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; width.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    out
}
