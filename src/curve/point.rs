use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::params::CurveParams;
use super::CurveError;

/// Affine curve point. The identity is its own variant in memory and is
/// written as `(0, 0)` on the wire, which never satisfies a curve with `b ≠ 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcPoint {
    Infinity,
    Affine {
        #[serde(with = "crate::crypto_serde::biguint_hex")]
        x: BigUint,
        #[serde(with = "crate::crypto_serde::biguint_hex")]
        y: BigUint,
    },
}

impl EcPoint {
    /// Build an affine point with coordinates reduced into `[0, p)`.
    pub fn affine(x: BigUint, y: BigUint, curve: &CurveParams) -> Self {
        EcPoint::Affine {
            x: x % &curve.p,
            y: y % &curve.p,
        }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, EcPoint::Infinity)
    }

    /// `x ‖ y`, each a fixed-width big-endian field element.
    pub fn to_bytes(&self, curve: &CurveParams) -> Vec<u8> {
        let width = curve.field_bytes();
        let mut out = vec![0u8; 2 * width];
        if let EcPoint::Affine { x, y } = self {
            write_be(x, &mut out[..width]);
            write_be(y, &mut out[width..]);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8], curve: &CurveParams) -> Result<Self, CurveError> {
        let width = curve.field_bytes();
        if bytes.len() != 2 * width {
            return Err(CurveError::InvalidEncoding {
                expected: 2 * width,
                actual: bytes.len(),
            });
        }

        let x = BigUint::from_bytes_be(&bytes[..width]);
        let y = BigUint::from_bytes_be(&bytes[width..]);
        if x.is_zero() && y.is_zero() {
            return Ok(EcPoint::Infinity);
        }
        if x >= curve.p || y >= curve.p {
            return Err(CurveError::CoordinateOutOfRange);
        }

        let point = EcPoint::Affine { x, y };
        if !curve.is_on_curve(&point) {
            return Err(CurveError::NotOnCurve);
        }
        Ok(point)
    }
}

/// Left-pad `value` into `out` as big-endian bytes.
pub(crate) fn write_be(value: &BigUint, out: &mut [u8]) {
    let bytes = value.to_bytes_be();
    let start = out.len().saturating_sub(bytes.len());
    let skip = bytes.len().saturating_sub(out.len());
    out[start..].copy_from_slice(&bytes[skip..]);
}
