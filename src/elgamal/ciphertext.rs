use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::curve::{CurveParams, EcPoint};

use super::ElGamalError;

/// `(C1, C2) = (r·G, m·G + r·Q)`.
///
/// `randomness` is retained only when the ciphertext was produced locally and
/// is never serialized or compared.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElGamalCiphertext {
    pub c1: EcPoint,
    pub c2: EcPoint,
    #[serde(skip)]
    pub randomness: Option<BigUint>,
}

impl PartialEq for ElGamalCiphertext {
    fn eq(&self, other: &Self) -> bool {
        self.c1 == other.c1 && self.c2 == other.c2
    }
}

impl Eq for ElGamalCiphertext {}

impl ElGamalCiphertext {
    pub fn new(c1: EcPoint, c2: EcPoint) -> Self {
        Self {
            c1,
            c2,
            randomness: None,
        }
    }

    /// Number of bytes in the wire encoding for `curve` (128 on BN254).
    pub fn encoded_len(curve: &CurveParams) -> usize {
        4 * curve.field_bytes()
    }

    /// `C1.x ‖ C1.y ‖ C2.x ‖ C2.y`, each a fixed-width big-endian field element.
    pub fn to_bytes(&self, curve: &CurveParams) -> Vec<u8> {
        let mut out = self.c1.to_bytes(curve);
        out.extend_from_slice(&self.c2.to_bytes(curve));
        out
    }

    pub fn from_bytes(bytes: &[u8], curve: &CurveParams) -> Result<Self, ElGamalError> {
        let expected = Self::encoded_len(curve);
        if bytes.len() != expected {
            return Err(ElGamalError::InvalidCiphertextLength {
                expected,
                actual: bytes.len(),
            });
        }
        let half = expected / 2;
        let c1 = EcPoint::from_bytes(&bytes[..half], curve)?;
        let c2 = EcPoint::from_bytes(&bytes[half..], curve)?;
        Ok(Self::new(c1, c2))
    }

    /// Drop the locally retained randomness.
    pub fn without_randomness(mut self) -> Self {
        self.randomness = None;
        self
    }
}
