use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::modular::{mod_inverse, sub_mod};

use super::params::CurveParams;
use super::point::EcPoint;
use super::CurveError;

const LOG_TARGET: &str = "rps::curve";

/// Point addition with the identity and vertical-line cases handled first.
pub fn ec_add(curve: &CurveParams, p: &EcPoint, q: &EcPoint) -> Result<EcPoint, CurveError> {
    let (x1, y1, x2, y2) = match (p, q) {
        (EcPoint::Infinity, _) => return Ok(q.clone()),
        (_, EcPoint::Infinity) => return Ok(p.clone()),
        (EcPoint::Affine { x: x1, y: y1 }, EcPoint::Affine { x: x2, y: y2 }) => {
            let modulus = &curve.p;
            (x1 % modulus, y1 % modulus, x2 % modulus, y2 % modulus)
        }
    };

    if x1 == x2 {
        if y1 != y2 {
            return Ok(EcPoint::Infinity);
        }
        return ec_double(curve, p);
    }

    let modulus = &curve.p;
    let numerator = sub_mod(&y2, &y1, modulus);
    let denominator = sub_mod(&x2, &x1, modulus);
    let lambda = numerator * invert(&denominator, curve, "addition")? % modulus;

    let x3 = sub_mod(&(&lambda * &lambda), &(&x1 + &x2), modulus);
    let y3 = sub_mod(&(&lambda * sub_mod(&x1, &x3, modulus)), &y1, modulus);
    Ok(EcPoint::Affine { x: x3, y: y3 })
}

/// Tangent-line doubling; points of order two double to the identity.
pub fn ec_double(curve: &CurveParams, p: &EcPoint) -> Result<EcPoint, CurveError> {
    let (x, y) = match p {
        EcPoint::Infinity => return Ok(EcPoint::Infinity),
        EcPoint::Affine { x, y } => (x % &curve.p, y % &curve.p),
    };
    if y.is_zero() {
        return Ok(EcPoint::Infinity);
    }

    let modulus = &curve.p;
    let numerator = (BigUint::from(3u32) * &x * &x + &curve.a) % modulus;
    let denominator = (BigUint::from(2u32) * &y) % modulus;
    let lambda = numerator * invert(&denominator, curve, "doubling")? % modulus;

    let x3 = sub_mod(&(&lambda * &lambda), &(BigUint::from(2u32) * &x), modulus);
    let y3 = sub_mod(&(&lambda * sub_mod(&x, &x3, modulus)), &y, modulus);
    Ok(EcPoint::Affine { x: x3, y: y3 })
}

/// Double-and-add, consuming the scalar from its least significant bit.
pub fn ec_mul(curve: &CurveParams, p: &EcPoint, scalar: &BigUint) -> Result<EcPoint, CurveError> {
    let mut result = EcPoint::Infinity;
    let mut addend = p.clone();
    for i in 0..scalar.bits() {
        if scalar.bit(i) {
            result = ec_add(curve, &result, &addend)?;
        }
        addend = ec_double(curve, &addend)?;
    }
    Ok(result)
}

/// Scalar multiplication by a signed scalar: `(-k)·P = -(k·P)`.
pub fn ec_mul_signed(curve: &CurveParams, p: &EcPoint, scalar: &BigInt) -> Result<EcPoint, CurveError> {
    let product = ec_mul(curve, p, scalar.magnitude())?;
    if scalar.sign() == Sign::Minus {
        Ok(ec_neg(curve, &product))
    } else {
        Ok(product)
    }
}

pub fn ec_neg(curve: &CurveParams, p: &EcPoint) -> EcPoint {
    match p {
        EcPoint::Infinity => EcPoint::Infinity,
        EcPoint::Affine { x, y } => EcPoint::Affine {
            x: x % &curve.p,
            y: sub_mod(&BigUint::zero(), y, &curve.p),
        },
    }
}

pub fn ec_sub(curve: &CurveParams, p: &EcPoint, q: &EcPoint) -> Result<EcPoint, CurveError> {
    ec_add(curve, p, &ec_neg(curve, q))
}

fn invert(
    denominator: &BigUint,
    curve: &CurveParams,
    operation: &'static str,
) -> Result<BigUint, CurveError> {
    mod_inverse(denominator, &curve.p).map_err(|err| {
        tracing::error!(
            target: LOG_TARGET,
            curve = curve.name,
            operation,
            error = %err,
            "zero denominator in curve arithmetic"
        );
        CurveError::DegenerateOperation { operation }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bn254;
    use ark_bn254::{Fr, G1Affine, G1Projective};
    use ark_ec::{CurveGroup, PrimeGroup};
    use ark_ff::{BigInteger, PrimeField, UniformRand};
    use ark_std::test_rng;

    fn from_ark(point: G1Affine) -> EcPoint {
        if point.infinity {
            return EcPoint::Infinity;
        }
        EcPoint::Affine {
            x: BigUint::from_bytes_be(&point.x.into_bigint().to_bytes_be()),
            y: BigUint::from_bytes_be(&point.y.into_bigint().to_bytes_be()),
        }
    }

    fn scalar_to_biguint(k: Fr) -> BigUint {
        BigUint::from_bytes_be(&k.into_bigint().to_bytes_be())
    }

    #[test]
    fn scalar_multiplication_agrees_with_arkworks() {
        let curve = bn254();
        let mut rng = test_rng();
        for _ in 0..8 {
            let k = Fr::rand(&mut rng);
            let expected = from_ark((G1Projective::generator() * k).into_affine());
            let actual = ec_mul(curve, &curve.generator, &scalar_to_biguint(k)).unwrap();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn addition_and_doubling_agree_with_arkworks() {
        let curve = bn254();
        let g = G1Projective::generator();
        let two_g = from_ark((g + g).into_affine());
        let three_g = from_ark((g + g + g).into_affine());

        let doubled = ec_double(curve, &curve.generator).unwrap();
        assert_eq!(doubled, two_g);
        assert_eq!(ec_add(curve, &doubled, &curve.generator).unwrap(), three_g);
        assert_eq!(ec_add(curve, &curve.generator, &curve.generator).unwrap(), two_g);
    }

    #[test]
    fn identity_short_circuits() {
        let curve = bn254();
        let g = &curve.generator;
        assert_eq!(ec_add(curve, &EcPoint::Infinity, g).unwrap(), *g);
        assert_eq!(ec_add(curve, g, &EcPoint::Infinity).unwrap(), *g);
        assert_eq!(ec_double(curve, &EcPoint::Infinity).unwrap(), EcPoint::Infinity);
        assert_eq!(ec_neg(curve, &EcPoint::Infinity), EcPoint::Infinity);
    }

    #[test]
    fn point_plus_negation_is_identity() {
        let curve = bn254();
        let p = ec_mul(curve, &curve.generator, &BigUint::from(12345u32)).unwrap();
        let neg = ec_neg(curve, &p);
        assert!(curve.is_on_curve(&neg));
        assert_eq!(ec_add(curve, &p, &neg).unwrap(), EcPoint::Infinity);
        assert_eq!(ec_sub(curve, &p, &p).unwrap(), EcPoint::Infinity);
    }

    #[test]
    fn order_two_point_doubles_to_identity() {
        let curve = bn254();
        let fake = EcPoint::Affine {
            x: BigUint::from(5u32),
            y: BigUint::zero(),
        };
        assert_eq!(ec_double(curve, &fake).unwrap(), EcPoint::Infinity);
    }

    #[test]
    fn multiplying_by_group_order_gives_identity() {
        let curve = bn254();
        assert_eq!(
            ec_mul(curve, &curve.generator, &curve.n).unwrap(),
            EcPoint::Infinity
        );
        assert_eq!(
            ec_mul(curve, &curve.generator, &BigUint::zero()).unwrap(),
            EcPoint::Infinity
        );
    }

    #[test]
    fn signed_multiplication_negates() {
        let curve = bn254();
        let three = ec_mul(curve, &curve.generator, &BigUint::from(3u32)).unwrap();
        let minus_three = ec_mul_signed(curve, &curve.generator, &BigInt::from(-3)).unwrap();
        assert_eq!(minus_three, ec_neg(curve, &three));
        assert_eq!(ec_add(curve, &three, &minus_three).unwrap(), EcPoint::Infinity);
    }

    #[test]
    fn composite_modulus_surfaces_degenerate_operation() {
        // A non-prime modulus makes some denominators non-invertible
        let broken = CurveParams {
            name: "broken",
            p: BigUint::from(15u32),
            a: BigUint::zero(),
            b: BigUint::from(3u32),
            n: BigUint::from(7u32),
            generator: EcPoint::Infinity,
        };
        let p = EcPoint::Affine {
            x: BigUint::from(1u32),
            y: BigUint::from(1u32),
        };
        let q = EcPoint::Affine {
            x: BigUint::from(4u32),
            y: BigUint::from(2u32),
        };
        assert_eq!(
            ec_add(&broken, &p, &q),
            Err(CurveError::DegenerateOperation { operation: "addition" })
        );
    }
}
