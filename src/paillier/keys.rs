use std::fmt;

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_prime::nt_funcs::is_prime;
use num_prime::PrimalityTestConfig;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::modular::{mod_inverse, mod_pow};

use super::PaillierError;

const LOG_TARGET: &str = "rps::paillier";

/// Public key `(n, g)`; safe to hand to clients.
///
/// Deserialization goes through [`PaillierPublicKey::new`], so a decoded key
/// is validated and carries its `n²`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPaillierPublicKey")]
pub struct PaillierPublicKey {
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    pub n: BigUint,
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    pub g: BigUint,
    #[serde(skip)]
    n_squared: BigUint,
}

impl PaillierPublicKey {
    pub fn new(n: BigUint, g: BigUint) -> Result<Self, PaillierError> {
        if n <= BigUint::one() {
            return Err(PaillierError::InvalidKey("modulus must exceed one".into()));
        }
        let n_squared = &n * &n;
        if g.is_zero() || g >= n_squared || !g.gcd(&n_squared).is_one() {
            return Err(PaillierError::InvalidKey("generator must be a unit mod n²".into()));
        }
        Ok(Self { n, g, n_squared })
    }

    /// `g = n + 1`, the standard simplification.
    pub fn with_default_generator(n: BigUint) -> Result<Self, PaillierError> {
        let g = &n + BigUint::one();
        Self::new(n, g)
    }

    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Byte width of a serialized ciphertext.
    pub fn ciphertext_bytes(&self) -> usize {
        ((self.n_squared.bits() + 7) / 8) as usize
    }
}

#[derive(Deserialize)]
struct RawPaillierPublicKey {
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    n: BigUint,
    #[serde(with = "crate::crypto_serde::biguint_hex")]
    g: BigUint,
}

impl TryFrom<RawPaillierPublicKey> for PaillierPublicKey {
    type Error = PaillierError;

    fn try_from(raw: RawPaillierPublicKey) -> Result<Self, Self::Error> {
        Self::new(raw.n, raw.g)
    }
}

/// `L(u) = (u - 1) / n`.
pub(crate) fn l_function(u: &BigUint, n: &BigUint) -> BigUint {
    (u - BigUint::one()) / n
}

/// Private key `(λ, μ)`; server-side only.
#[derive(Clone, PartialEq, Eq)]
pub struct PaillierPrivateKey {
    lambda: BigUint,
    mu: BigUint,
}

impl fmt::Debug for PaillierPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaillierPrivateKey(<redacted>)")
    }
}

impl PaillierPrivateKey {
    pub fn new(lambda: BigUint, mu: BigUint) -> Self {
        Self { lambda, mu }
    }

    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    pub fn mu(&self) -> &BigUint {
        &self.mu
    }

    /// Derive both keys from the factorization `n = p·q`.
    pub fn from_primes(
        p: &BigUint,
        q: &BigUint,
    ) -> Result<(PaillierPublicKey, PaillierPrivateKey), PaillierError> {
        if p == q {
            return Err(PaillierError::InvalidKey("p and q must be distinct".into()));
        }
        let one = BigUint::one();
        let n = p * q;
        let phi = (p - &one) * (q - &one);
        if !n.gcd(&phi).is_one() {
            return Err(PaillierError::InvalidKey("gcd(pq, (p-1)(q-1)) must be 1".into()));
        }

        let public = PaillierPublicKey::with_default_generator(n)?;
        let lambda = (p - &one).lcm(&(q - &one));
        let private = Self::derive(&public, lambda)?;
        Ok((public, private))
    }

    /// Compute `μ = L(g^λ mod n²)⁻¹ mod n` for a given `λ`.
    pub fn derive(public: &PaillierPublicKey, lambda: BigUint) -> Result<Self, PaillierError> {
        let u = mod_pow(&public.g, &lambda, public.n_squared())?;
        let mu = mod_inverse(&l_function(&u, &public.n), &public.n)?;
        Ok(Self { lambda, mu })
    }
}

pub fn generate_keypair(
    modulus_bits: u64,
) -> Result<(PaillierPublicKey, PaillierPrivateKey), PaillierError> {
    generate_keypair_with_rng(modulus_bits, &mut OsRng)
}

pub fn generate_keypair_with_rng<R: RngCore + CryptoRng>(
    modulus_bits: u64,
    rng: &mut R,
) -> Result<(PaillierPublicKey, PaillierPrivateKey), PaillierError> {
    if modulus_bits < 16 {
        return Err(PaillierError::InvalidKey("modulus must be at least 16 bits".into()));
    }
    loop {
        let p = random_prime(modulus_bits / 2, rng);
        let q = random_prime(modulus_bits - modulus_bits / 2, rng);
        match PaillierPrivateKey::from_primes(&p, &q) {
            Ok(pair) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    bits = pair.0.n.bits(),
                    "generated paillier keypair"
                );
                return Ok(pair);
            }
            Err(err) => {
                tracing::debug!(target: LOG_TARGET, error = %err, "rejected prime pair");
            }
        }
    }
}

fn random_prime<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate |= BigUint::one() << (bits - 1);
        candidate |= BigUint::one();
        if is_prime(&candidate, Some(PrimalityTestConfig::default())).probably() {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::small_paillier_primes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn from_primes_matches_textbook_values() {
        // Classic example: p = 7, q = 11, n = 77, λ = lcm(6, 10) = 30
        let (public, private) =
            PaillierPrivateKey::from_primes(&BigUint::from(7u32), &BigUint::from(11u32)).unwrap();
        assert_eq!(public.n, BigUint::from(77u32));
        assert_eq!(public.g, BigUint::from(78u32));
        assert_eq!(private.lambda(), &BigUint::from(30u32));
        // μ = 30⁻¹ mod 77 = 18 since 30·18 = 540 = 7·77 + 1
        assert_eq!(private.mu(), &BigUint::from(18u32));
    }

    #[test]
    fn identical_primes_are_rejected() {
        let p = BigUint::from(13u32);
        assert!(PaillierPrivateKey::from_primes(&p, &p).is_err());
    }

    #[test]
    fn generated_modulus_has_requested_size() {
        let mut rng = StdRng::seed_from_u64(21);
        let (public, _) = generate_keypair_with_rng(128, &mut rng).unwrap();
        assert!(public.n.bits() >= 127 && public.n.bits() <= 128);
        assert_eq!(public.g, &public.n + BigUint::one());
    }

    #[test]
    fn deserialized_public_key_is_usable() {
        let (p, q) = small_paillier_primes();
        let (public, private) = PaillierPrivateKey::from_primes(&p, &q).unwrap();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("n_squared"));

        let restored: PaillierPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, public);
        assert_eq!(restored.n_squared(), &(&public.n * &public.n));

        let ct = crate::paillier::encrypt(&BigUint::from(2u32), &restored).unwrap();
        let sum = crate::paillier::add_encrypted(&ct, &ct, &restored);
        assert_eq!(
            crate::paillier::decrypt(&sum, &private, &restored).unwrap(),
            BigUint::from(4u32)
        );
    }

    #[test]
    fn deserializing_an_invalid_public_key_fails() {
        let zero_generator = r#"{"n":"0x4d","g":"0x00"}"#;
        assert!(serde_json::from_str::<PaillierPublicKey>(zero_generator).is_err());
        let unit_modulus = r#"{"n":"0x01","g":"0x02"}"#;
        assert!(serde_json::from_str::<PaillierPublicKey>(unit_modulus).is_err());
    }

    #[test]
    fn generator_must_be_a_unit() {
        let n = BigUint::from(77u32);
        assert!(PaillierPublicKey::new(n.clone(), BigUint::from(7u32)).is_err());
        assert!(PaillierPublicKey::new(n, BigUint::zero()).is_err());
    }

    #[test]
    fn private_key_debug_is_redacted() {
        let key = PaillierPrivateKey::new(BigUint::from(30u32), BigUint::from(18u32));
        assert!(!format!("{key:?}").contains("18"));
    }
}
