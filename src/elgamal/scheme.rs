use num_bigint::{BigInt, BigUint};
use num_traits::One;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::curve::{ec_add, ec_mul, ec_mul_signed, ec_neg, ec_sub};
use crate::modular::{random_in_range_with_rng, sub_mod};

use super::{
    DecryptionDomain, DecryptionTable, ElGamalCiphertext, ElGamalError, ElGamalPrivateKey,
    ElGamalPublicKey,
};

const LOG_TARGET: &str = "rps::elgamal";

/// Encrypt `m` as `(r·G, m·G + r·Q)` with fresh randomness from the OS.
pub fn encrypt(m: i64, public: &ElGamalPublicKey) -> Result<ElGamalCiphertext, ElGamalError> {
    encrypt_with_rng(m, public, &mut OsRng)
}

pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    m: i64,
    public: &ElGamalPublicKey,
    rng: &mut R,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let r = random_in_range_with_rng(&BigUint::one(), &public.curve.n, rng)?;
    encrypt_with_randomness(m, &r, public)
}

/// Deterministic encryption under caller-supplied randomness `r ∈ [1, n)`.
pub fn encrypt_with_randomness(
    m: i64,
    r: &BigUint,
    public: &ElGamalPublicKey,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let curve = public.curve;
    let message = ec_mul_signed(curve, &public.generator, &BigInt::from(m))?;
    let c1 = ec_mul(curve, &public.generator, r)?;
    let shared = ec_mul(curve, &public.q, r)?;
    let c2 = ec_add(curve, &message, &shared)?;

    Ok(ElGamalCiphertext {
        c1,
        c2,
        randomness: Some(r.clone()),
    })
}

/// Decrypt against the default game-difference domain `{-2..=2}`.
pub fn decrypt(
    ciphertext: &ElGamalCiphertext,
    private: &ElGamalPrivateKey,
    public: &ElGamalPublicKey,
) -> Result<i64, ElGamalError> {
    let table = DecryptionDomain::default().table(public)?;
    decrypt_in_domain(ciphertext, private, public, &table)
}

/// Recover `M = C2 - x·C1` and look it up in a precomputed candidate table.
///
/// A miss means the ciphertext was produced under another key, holds an
/// out-of-domain plaintext, or was tampered with.
pub fn decrypt_in_domain(
    ciphertext: &ElGamalCiphertext,
    private: &ElGamalPrivateKey,
    public: &ElGamalPublicKey,
    table: &DecryptionTable,
) -> Result<i64, ElGamalError> {
    let curve = public.curve;
    let mask = ec_mul(curve, &ciphertext.c1, private.scalar())?;
    let message = ec_sub(curve, &ciphertext.c2, &mask)?;

    table.lookup(&message).ok_or_else(|| {
        tracing::warn!(
            target: LOG_TARGET,
            candidates = table.len(),
            "decryption produced a point outside the plaintext domain"
        );
        ElGamalError::DiscreteLogNotFound
    })
}

/// Component-wise addition: an encryption of `m1 + m2`.
pub fn homomorphic_addition(
    a: &ElGamalCiphertext,
    b: &ElGamalCiphertext,
    public: &ElGamalPublicKey,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let curve = public.curve;
    let randomness = match (&a.randomness, &b.randomness) {
        (Some(ra), Some(rb)) => Some((ra + rb) % &curve.n),
        _ => None,
    };
    Ok(ElGamalCiphertext {
        c1: ec_add(curve, &a.c1, &b.c1)?,
        c2: ec_add(curve, &a.c2, &b.c2)?,
        randomness,
    })
}

/// An encryption of `-m` under the negated randomness.
pub fn negate(ciphertext: &ElGamalCiphertext, public: &ElGamalPublicKey) -> ElGamalCiphertext {
    let curve = public.curve;
    ElGamalCiphertext {
        c1: ec_neg(curve, &ciphertext.c1),
        c2: ec_neg(curve, &ciphertext.c2),
        randomness: ciphertext
            .randomness
            .as_ref()
            .map(|r| sub_mod(&BigUint::from(0u32), r, &curve.n)),
    }
}

/// An encryption of `m_a - m_b`; neither operand is decrypted.
pub fn homomorphic_difference(
    a: &ElGamalCiphertext,
    b: &ElGamalCiphertext,
    public: &ElGamalPublicKey,
) -> Result<ElGamalCiphertext, ElGamalError> {
    homomorphic_addition(a, &negate(b, public), public)
}

/// Shift the plaintext by a public `k`. Only `C2` carries the message.
pub fn scalar_addition(
    ciphertext: &ElGamalCiphertext,
    k: i64,
    public: &ElGamalPublicKey,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let curve = public.curve;
    let shift = ec_mul_signed(curve, &public.generator, &BigInt::from(k))?;
    Ok(ElGamalCiphertext {
        c1: ciphertext.c1.clone(),
        c2: ec_add(curve, &ciphertext.c2, &shift)?,
        randomness: ciphertext.randomness.clone(),
    })
}

pub fn scalar_subtraction(
    ciphertext: &ElGamalCiphertext,
    k: i64,
    public: &ElGamalPublicKey,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let curve = public.curve;
    let shift = ec_mul_signed(curve, &public.generator, &BigInt::from(k))?;
    Ok(ElGamalCiphertext {
        c1: ciphertext.c1.clone(),
        c2: ec_sub(curve, &ciphertext.c2, &shift)?,
        randomness: ciphertext.randomness.clone(),
    })
}

/// Add a fresh encryption of zero so the ciphertext is unlinkable to its origin.
pub fn rerandomize<R: RngCore + CryptoRng>(
    ciphertext: &ElGamalCiphertext,
    public: &ElGamalPublicKey,
    rng: &mut R,
) -> Result<ElGamalCiphertext, ElGamalError> {
    let zero = encrypt_with_rng(0, public, rng)?;
    homomorphic_addition(ciphertext, &zero, public)
}
