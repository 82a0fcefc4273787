//! Exact big-integer modular arithmetic shared by the curve engine and Paillier.
//!
//! Every randomized helper has a `*_with_rng` twin that accepts any
//! cryptographically secure generator; the plain variants draw from the OS.

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("modulus must be non-zero")]
    ZeroModulus,

    #[error("no modular inverse exists: gcd({value}, {modulus}) = {gcd}")]
    NoInverse {
        value: BigInt,
        modulus: BigUint,
        gcd: BigInt,
    },

    #[error("empty sampling range [{low}, {high})")]
    EmptyRange { low: BigUint, high: BigUint },
}

/// Square-and-multiply exponentiation `base^exponent mod modulus`.
///
/// The exponent is consumed bit by bit from the most significant end, so
/// arbitrarily large exponents cost `O(bits)` multiplications.
pub fn mod_pow(
    base: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, ArithmeticError> {
    if modulus.is_zero() {
        return Err(ArithmeticError::ZeroModulus);
    }
    if modulus.is_one() {
        return Ok(BigUint::zero());
    }

    let base = base % modulus;
    let mut acc = BigUint::one();
    for i in (0..exponent.bits()).rev() {
        acc = &acc * &acc % modulus;
        if exponent.bit(i) {
            acc = acc * &base % modulus;
        }
    }
    Ok(acc)
}

/// Inverse of `a` modulo `m` through the extended Euclidean algorithm.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint, ArithmeticError> {
    mod_inverse_signed(&BigInt::from(a.clone()), m)
}

/// Same as [`mod_inverse`] but accepts a signed operand, which is reduced first.
pub fn mod_inverse_signed(a: &BigInt, m: &BigUint) -> Result<BigUint, ArithmeticError> {
    if m.is_zero() {
        return Err(ArithmeticError::ZeroModulus);
    }

    let modulus = BigInt::from(m.clone());
    let reduced = a.mod_floor(&modulus);
    let egcd = reduced.extended_gcd(&modulus);
    if !egcd.gcd.is_one() {
        return Err(ArithmeticError::NoInverse {
            value: a.clone(),
            modulus: m.clone(),
            gcd: egcd.gcd,
        });
    }

    Ok(to_unsigned(egcd.x.mod_floor(&modulus)))
}

/// Reduce a signed value into `[0, m)`.
pub fn reduce_signed(value: &BigInt, m: &BigUint) -> Result<BigUint, ArithmeticError> {
    if m.is_zero() {
        return Err(ArithmeticError::ZeroModulus);
    }
    let modulus = BigInt::from(m.clone());
    Ok(to_unsigned(value.mod_floor(&modulus)))
}

/// `(a - b) mod m` without leaving the unsigned domain.
pub fn sub_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    let a = a % m;
    let b = b % m;
    if a >= b {
        a - b
    } else {
        m - (b - a)
    }
}

/// Cryptographically random integer of exactly `n_bytes` bytes of entropy.
pub fn random_bigint(n_bytes: usize) -> BigUint {
    random_bigint_with_rng(n_bytes, &mut OsRng)
}

pub fn random_bigint_with_rng<R: RngCore + CryptoRng>(n_bytes: usize, rng: &mut R) -> BigUint {
    let mut bytes = vec![0u8; n_bytes];
    rng.fill_bytes(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

/// Uniform sample from `[0, bound)`.
pub fn random_below_with_rng<R: RngCore + CryptoRng>(
    bound: &BigUint,
    rng: &mut R,
) -> Result<BigUint, ArithmeticError> {
    if bound.is_zero() {
        return Err(ArithmeticError::EmptyRange {
            low: BigUint::zero(),
            high: BigUint::zero(),
        });
    }
    Ok(rng.gen_biguint_below(bound))
}

/// Uniform sample from `[low, high)`.
pub fn random_in_range_with_rng<R: RngCore + CryptoRng>(
    low: &BigUint,
    high: &BigUint,
    rng: &mut R,
) -> Result<BigUint, ArithmeticError> {
    if low >= high {
        return Err(ArithmeticError::EmptyRange {
            low: low.clone(),
            high: high.clone(),
        });
    }
    Ok(rng.gen_biguint_range(low, high))
}

pub fn random_in_range(low: &BigUint, high: &BigUint) -> Result<BigUint, ArithmeticError> {
    random_in_range_with_rng(low, high, &mut OsRng)
}

/// Uniform sample from `[1, n)` with `gcd(r, n) = 1`.
pub fn random_coprime_with_rng<R: RngCore + CryptoRng>(
    n: &BigUint,
    rng: &mut R,
) -> Result<BigUint, ArithmeticError> {
    let one = BigUint::one();
    loop {
        let candidate = random_in_range_with_rng(&one, n, rng)?;
        if candidate.gcd(n).is_one() {
            return Ok(candidate);
        }
    }
}

fn to_unsigned(value: BigInt) -> BigUint {
    match value.to_biguint() {
        Some(v) => v,
        // mod_floor against a positive modulus never yields a negative value
        None => BigUint::zero(),
    }
}

/// Interpret `value ∈ [0, m)` as a signed residue in `(-m/2, m/2]`.
pub fn centered(value: &BigUint, m: &BigUint) -> BigInt {
    let half = m >> 1;
    if value > &half {
        BigInt::from_biguint(Sign::Minus, m - value)
    } else {
        BigInt::from(value.clone())
    }
}
