use std::fmt;

use num_bigint::BigUint;
use num_traits::One;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::curve::{ec_mul, CurveParams, EcPoint};
use crate::modular::random_in_range_with_rng;

use super::ElGamalError;

/// Public share: curve, generator `G` and `Q = x·G`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    pub curve: &'static CurveParams,
    pub generator: EcPoint,
    pub q: EcPoint,
}

/// Private scalar `x`. Never serialized and redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ElGamalPrivateKey {
    x: BigUint,
}

impl fmt::Debug for ElGamalPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ElGamalPrivateKey(<redacted>)")
    }
}

impl ElGamalPrivateKey {
    pub fn new(x: BigUint, curve: &CurveParams) -> Result<Self, ElGamalError> {
        let x = x % &curve.n;
        if x < BigUint::one() {
            return Err(ElGamalError::InvalidKey(
                "private scalar must be non-zero modulo the group order".into(),
            ));
        }
        Ok(Self { x })
    }

    pub fn scalar(&self) -> &BigUint {
        &self.x
    }

    pub fn public_key(&self, curve: &'static CurveParams) -> Result<ElGamalPublicKey, ElGamalError> {
        let q = ec_mul(curve, &curve.generator, &self.x)?;
        Ok(ElGamalPublicKey {
            curve,
            generator: curve.generator.clone(),
            q,
        })
    }

    pub fn from_bytes(bytes: &[u8], curve: &CurveParams) -> Result<Self, ElGamalError> {
        Self::new(BigUint::from_bytes_be(bytes), curve)
    }
}

impl ElGamalPublicKey {
    /// Reject keys whose public point is the identity or off the curve.
    pub fn validate(&self) -> Result<(), ElGamalError> {
        if self.q.is_infinity() || !self.curve.is_on_curve(&self.q) {
            return Err(ElGamalError::InvalidKey(
                "public point must be a non-identity curve point".into(),
            ));
        }
        if !self.curve.is_on_curve(&self.generator) || self.generator.is_infinity() {
            return Err(ElGamalError::InvalidKey("generator is not a curve point".into()));
        }
        Ok(())
    }

    /// Whether `private` is the discrete log of `Q`.
    pub fn matches(&self, private: &ElGamalPrivateKey) -> Result<bool, ElGamalError> {
        Ok(ec_mul(self.curve, &self.generator, private.scalar())? == self.q)
    }

    /// Wire form of `Q` (`x ‖ y`); the generator is implied by the curve.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.q.to_bytes(self.curve)
    }

    pub fn from_bytes(bytes: &[u8], curve: &'static CurveParams) -> Result<Self, ElGamalError> {
        let q = EcPoint::from_bytes(bytes, curve)?;
        let key = Self {
            curve,
            generator: curve.generator.clone(),
            q,
        };
        key.validate()?;
        Ok(key)
    }
}

pub fn generate_keypair(
    curve: &'static CurveParams,
) -> Result<(ElGamalPublicKey, ElGamalPrivateKey), ElGamalError> {
    generate_keypair_with_rng(curve, &mut OsRng)
}

pub fn generate_keypair_with_rng<R: RngCore + CryptoRng>(
    curve: &'static CurveParams,
    rng: &mut R,
) -> Result<(ElGamalPublicKey, ElGamalPrivateKey), ElGamalError> {
    let x = random_in_range_with_rng(&BigUint::one(), &curve.n, rng)?;
    let private = ElGamalPrivateKey { x };
    let public = private.public_key(curve)?;
    Ok((public, private))
}
