//! Affine elliptic-curve arithmetic over a prime field.
//!
//! The engine is parameterized by [`CurveParams`]; [`bn254`] supplies the
//! curve used by the game contract.

mod ops;
mod params;
mod point;

pub use ops::{ec_add, ec_double, ec_mul, ec_mul_signed, ec_neg, ec_sub};
pub use params::{bn254, CurveParams};
pub use point::EcPoint;
pub(crate) use point::write_be;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    #[error("invalid point encoding: expected {expected} bytes, got {actual}")]
    InvalidEncoding { expected: usize, actual: usize },

    #[error("coordinate is not a reduced field element")]
    CoordinateOutOfRange,

    #[error("point is not on the curve")]
    NotOnCurve,

    #[error("degenerate {operation}: zero denominator outside the exceptional cases")]
    DegenerateOperation { operation: &'static str },
}
