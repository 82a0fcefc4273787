use num_bigint::BigUint;
use num_traits::Num;
use once_cell::sync::Lazy;

use super::point::EcPoint;

/// Short Weierstrass curve `y² = x³ + a·x + b` over `F_p` with a prime-order
/// generator of order `n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveParams {
    pub name: &'static str,
    pub p: BigUint,
    pub a: BigUint,
    pub b: BigUint,
    pub n: BigUint,
    pub generator: EcPoint,
}

const BN254_P: &str = "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47";
const BN254_N: &str = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

static BN254: Lazy<CurveParams> = Lazy::new(|| CurveParams {
    name: "bn254",
    p: hex_constant(BN254_P),
    a: BigUint::from(0u32),
    b: BigUint::from(3u32),
    n: hex_constant(BN254_N),
    generator: EcPoint::Affine {
        x: BigUint::from(1u32),
        y: BigUint::from(2u32),
    },
});

fn hex_constant(value: &str) -> BigUint {
    // Only ever called on the literals above
    BigUint::from_str_radix(value, 16).unwrap_or_default()
}

/// BN254 (alt_bn128) G1, the pairing-friendly curve used by the game contract.
pub fn bn254() -> &'static CurveParams {
    &BN254
}

impl CurveParams {
    /// Byte width of one serialized field element.
    pub fn field_bytes(&self) -> usize {
        ((self.p.bits() + 7) / 8) as usize
    }

    pub fn is_on_curve(&self, point: &EcPoint) -> bool {
        match point {
            EcPoint::Infinity => true,
            EcPoint::Affine { x, y } => {
                if x >= &self.p || y >= &self.p {
                    return false;
                }
                let lhs = y * y % &self.p;
                let rhs = (x * x * x + &self.a * x + &self.b) % &self.p;
                lhs == rhs
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bn254_generator_is_on_curve() {
        let curve = bn254();
        assert!(curve.is_on_curve(&curve.generator));
        assert_eq!(curve.field_bytes(), 32);
    }

    #[test]
    fn wire_identity_is_not_a_curve_point() {
        let curve = bn254();
        let origin = EcPoint::Affine {
            x: BigUint::from(0u32),
            y: BigUint::from(0u32),
        };
        assert!(!curve.is_on_curve(&origin));
    }
}
