//! Dense polynomials over the secp256k1 scalar field and synthetic division.
//!
//! Ascending-coefficient representation throughout, per the Design Notes:
//! `[a_0, ..., a_d]`. No FFT or interpolation is provided — only evaluation
//! and division by `(X - x)`, which is all the zero-evaluation KZG-DLEQ
//! protocol needs.

use crate::curve::Scalar;
use thiserror::Error;

/// Errors from polynomial operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    /// The polynomial evaluated to a nonzero value where the protocol
    /// requires `p(x) = 0`.
    #[error("polynomial does not vanish at the evaluation point")]
    NonZeroAtPoint,
    /// An empty coefficient list has no defined degree.
    #[error("polynomial has no coefficients")]
    Empty,
}

/// A polynomial given by its coefficients in ascending degree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    /// `coeffs[i]` is the coefficient of `X^i`.
    coeffs: Vec<Scalar>,
}

impl Polynomial {
    /// Builds a polynomial from ascending coefficients, reducing each mod N.
    pub fn new(coeffs: Vec<Scalar>) -> Result<Self, PolyError> {
        if coeffs.is_empty() {
            return Err(PolyError::Empty);
        }
        Ok(Polynomial { coeffs })
    }

    /// Degree (`length - 1`).
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficient count.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// True if the coefficient list is empty (never true for a constructed
    /// `Polynomial`, kept for API symmetry with other containers).
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Coefficients, ascending.
    pub fn coeffs(&self) -> &[Scalar] {
        &self.coeffs
    }

    /// Evaluates `p(x)` via Horner's method, descending from the top
    /// coefficient.
    pub fn evaluate(&self, x: &Scalar) -> Scalar {
        let mut acc = Scalar::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc.mul(x).add(c);
        }
        acc
    }

    /// True if `p(x) = 0`.
    pub fn vanishes_at(&self, x: &Scalar) -> bool {
        self.evaluate(x).is_zero()
    }

    /// Synthetic division by `(X - x)`, valid only when `p(x) = 0`:
    ///
    /// ```text
    /// b[d] = c[d]; for i = d-1..0: b[i] = c[i] + x·b[i+1]; remainder = b[0] = 0
    /// q = [b[1], ..., b[d]]
    /// ```
    ///
    /// Returns [`PolyError::NonZeroAtPoint`] if the remainder is nonzero.
    pub fn divide_by_root(&self, x: &Scalar) -> Result<Polynomial, PolyError> {
        let d = self.degree();
        let mut b = vec![Scalar::zero(); d + 1];
        b[d] = self.coeffs[d].clone();
        for i in (0..d).rev() {
            b[i] = self.coeffs[i].add(&x.mul(&b[i + 1]));
        }
        if !b[0].is_zero() {
            return Err(PolyError::NonZeroAtPoint);
        }
        if d == 0 {
            // Degree-0 polynomial vanishing at x is the zero polynomial;
            // the quotient is the (degenerate) zero polynomial of length 1.
            return Ok(Polynomial {
                coeffs: vec![Scalar::zero()],
            });
        }
        Ok(Polynomial {
            coeffs: b[1..=d].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: u64) -> Scalar {
        Scalar::from(v)
    }

    #[test]
    fn evaluates_constant() {
        let p = Polynomial::new(vec![s(7)]).unwrap();
        assert_eq!(p.evaluate(&s(100)), s(7));
    }

    #[test]
    fn synthetic_division_matches_spec_example() {
        // p(t) = -35 + 7t, x = 5: p(5) = -35 + 35 = 0, q(t) = 7.
        let n = crate::curve::group_order();
        let neg35 = Scalar::from_biguint_mod(&n - num_bigint::BigUint::from(35u8));
        let p = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let x = s(5);
        assert!(p.vanishes_at(&x));
        let q = p.divide_by_root(&x).unwrap();
        assert_eq!(q.coeffs(), &[s(7)]);
    }

    #[test]
    fn division_fails_when_not_vanishing() {
        let p = Polynomial::new(vec![s(1), s(1)]).unwrap();
        let err = p.divide_by_root(&s(5)).unwrap_err();
        assert_eq!(err, PolyError::NonZeroAtPoint);
    }

    #[test]
    fn quotient_recovers_original_via_horner_identity() {
        // For any p vanishing at x: (X - x)*q(X) = p(X). Check at a random
        // evaluation point t by direct recomputation rather than a generic
        // multiply routine (out of scope per the Non-goals).
        let n = crate::curve::group_order();
        let neg_x = Scalar::from_biguint_mod(&n - num_bigint::BigUint::from(42u8));
        let p = Polynomial::new(vec![neg_x.mul(&s(3)), s(3)]).unwrap(); // p(t) = 3t - 3*42
        let x = s(42);
        assert!(p.vanishes_at(&x));
        let q = p.divide_by_root(&x).unwrap();
        let t = s(99);
        let lhs = t.sub(&x).mul(&q.evaluate(&t));
        assert_eq!(lhs, p.evaluate(&t));
    }
}
