use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto_serde::{biguint_from_hex, biguint_to_fixed_hex};
use crate::modular::{centered, mod_inverse, mod_pow, random_coprime_with_rng, reduce_signed};

use super::keys::l_function;
use super::{PaillierError, PaillierPrivateKey, PaillierPublicKey};

/// A Paillier ciphertext, an element of `Z/n²Z`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaillierCiphertext(#[serde(with = "crate::crypto_serde::biguint_hex")] pub BigUint);

impl PaillierCiphertext {
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Fixed-width hex: `ciphertext_bytes()` bytes, left-padded.
    pub fn to_hex(&self, public: &PaillierPublicKey) -> Result<String, PaillierError> {
        biguint_to_fixed_hex(&self.0, public.ciphertext_bytes())
            .ok_or(PaillierError::InvalidCiphertext)
    }

    pub fn from_hex(value: &str, public: &PaillierPublicKey) -> Result<Self, PaillierError> {
        let parsed = biguint_from_hex(value).map_err(|err| PaillierError::Encoding(err.to_string()))?;
        let ciphertext = Self(parsed);
        ciphertext.validate(public)?;
        Ok(ciphertext)
    }

    pub fn to_bytes(&self, public: &PaillierPublicKey) -> Result<Vec<u8>, PaillierError> {
        let width = public.ciphertext_bytes();
        let raw = self.0.to_bytes_be();
        if raw.len() > width {
            return Err(PaillierError::InvalidCiphertext);
        }
        let mut out = vec![0u8; width - raw.len()];
        out.extend_from_slice(&raw);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8], public: &PaillierPublicKey) -> Result<Self, PaillierError> {
        let ciphertext = Self(BigUint::from_bytes_be(bytes));
        ciphertext.validate(public)?;
        Ok(ciphertext)
    }

    /// Reject values outside `[1, n²)` or sharing a factor with `n`.
    pub fn validate(&self, public: &PaillierPublicKey) -> Result<(), PaillierError> {
        if self.0.is_zero() || &self.0 >= public.n_squared() || !self.0.gcd(&public.n).is_one() {
            return Err(PaillierError::InvalidCiphertext);
        }
        Ok(())
    }
}

pub fn encrypt(m: &BigUint, public: &PaillierPublicKey) -> Result<PaillierCiphertext, PaillierError> {
    encrypt_with_rng(m, public, &mut OsRng)
}

pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    m: &BigUint,
    public: &PaillierPublicKey,
    rng: &mut R,
) -> Result<PaillierCiphertext, PaillierError> {
    let r = random_coprime_with_rng(&public.n, rng)?;
    encrypt_with_randomness(m, &r, public)
}

/// `c = g^m · r^n mod n²` for `m ∈ [0, n)` and a unit `r`.
pub fn encrypt_with_randomness(
    m: &BigUint,
    r: &BigUint,
    public: &PaillierPublicKey,
) -> Result<PaillierCiphertext, PaillierError> {
    if m >= &public.n {
        return Err(PaillierError::PlaintextOutOfRange);
    }
    if r.is_zero() || !r.gcd(&public.n).is_one() {
        return Err(PaillierError::InvalidKey("randomness must be a unit mod n".into()));
    }
    let n_squared = public.n_squared();
    let gm = mod_pow(&public.g, m, n_squared)?;
    let rn = mod_pow(r, &public.n, n_squared)?;
    Ok(PaillierCiphertext(gm * rn % n_squared))
}

/// Encrypt a signed value as its residue mod `n`.
pub fn encrypt_signed<R: RngCore + CryptoRng>(
    m: i64,
    public: &PaillierPublicKey,
    rng: &mut R,
) -> Result<PaillierCiphertext, PaillierError> {
    let residue = reduce_signed(&BigInt::from(m), &public.n)?;
    encrypt_with_rng(&residue, public, rng)
}

/// `m = L(c^λ mod n²) · μ mod n`.
pub fn decrypt(
    ciphertext: &PaillierCiphertext,
    private: &PaillierPrivateKey,
    public: &PaillierPublicKey,
) -> Result<BigUint, PaillierError> {
    ciphertext.validate(public)?;
    let u = mod_pow(&ciphertext.0, private.lambda(), public.n_squared())?;
    Ok(l_function(&u, &public.n) * private.mu() % &public.n)
}

/// Decrypt and read the residue as a value in `(-n/2, n/2]`.
pub fn decrypt_signed(
    ciphertext: &PaillierCiphertext,
    private: &PaillierPrivateKey,
    public: &PaillierPublicKey,
) -> Result<BigInt, PaillierError> {
    let residue = decrypt(ciphertext, private, public)?;
    Ok(centered(&residue, &public.n))
}

/// Encryption of `m1 + m2 mod n`.
pub fn add_encrypted(
    a: &PaillierCiphertext,
    b: &PaillierCiphertext,
    public: &PaillierPublicKey,
) -> PaillierCiphertext {
    PaillierCiphertext(&a.0 * &b.0 % public.n_squared())
}

/// Encryption of `k·m mod n`.
pub fn multiply_by_constant(
    ciphertext: &PaillierCiphertext,
    k: &BigUint,
    public: &PaillierPublicKey,
) -> Result<PaillierCiphertext, PaillierError> {
    Ok(PaillierCiphertext(mod_pow(&ciphertext.0, k, public.n_squared())?))
}

/// Encryption of `-m mod n` via the inverse in `Z/n²Z`.
pub fn negate(
    ciphertext: &PaillierCiphertext,
    public: &PaillierPublicKey,
) -> Result<PaillierCiphertext, PaillierError> {
    mod_inverse(&ciphertext.0, public.n_squared())
        .map(PaillierCiphertext)
        .map_err(|_| PaillierError::InvalidCiphertext)
}

/// Encryption of `m1 - m2 mod n`.
pub fn subtract_encrypted(
    a: &PaillierCiphertext,
    b: &PaillierCiphertext,
    public: &PaillierPublicKey,
) -> Result<PaillierCiphertext, PaillierError> {
    Ok(add_encrypted(a, &negate(b, public)?, public))
}

/// Multiply by a fresh `r^n`, leaving the plaintext unchanged.
pub fn rerandomize<R: RngCore + CryptoRng>(
    ciphertext: &PaillierCiphertext,
    public: &PaillierPublicKey,
    rng: &mut R,
) -> Result<PaillierCiphertext, PaillierError> {
    let zero = encrypt_with_rng(&BigUint::zero(), public, rng)?;
    Ok(add_encrypted(ciphertext, &zero, public))
}
