//! Single-prover KZG-DLEQ: commit, witness, proof, and verification.
//!
//! Proves that a committed polynomial `p` vanishes at a public point `x`,
//! via a KZG commitment `C = p(s)·G`, a witness `W = q(s)·G` for
//! `q = p / (X - x)`, and a Schnorr DLEQ argument that `log_G(W) = log_T(C)`
//! on the auxiliary base `T = P - x·G` (§4.4).

use crate::curve::{mul_generator, CurveError, NonceContextPart, Point, Scalar};
use crate::poly::{PolyError, Polynomial};
use crate::srs::{self, SrsError};
use crate::transcript::build_challenge;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while producing a proof.
#[derive(Debug, Error)]
pub enum ProveError {
    /// `p(x) != 0`.
    #[error("polynomial does not vanish at the evaluation point")]
    PolynomialNonZero,
    /// `s = 0 mod N`, or `s = x` (making `T = 0`), or the polynomial is
    /// identically zero.
    #[error("degenerate setup")]
    DegenerateSetup,
    /// `x` is out of the required `[1, N)` range.
    #[error("evaluation point out of range")]
    InvalidInput,
    /// The polynomial has more coefficients than the SRS provides powers
    /// for.
    #[error("polynomial degree exceeds SRS degree")]
    DegreeExceedsSrs,
    /// A curve operation failed unexpectedly (e.g. an internal point-at-
    /// infinity collision).
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    /// Synthetic division reported a nonzero remainder (mirrors
    /// `PolynomialNonZero` but surfaced from the division step).
    #[error("synthetic division error: {0}")]
    Poly(#[from] PolyError),
    /// SRS-side failure when committing via a structured reference string.
    #[error("SRS error: {0}")]
    Srs(#[from] SrsError),
}

/// Errors raised while verifying a proof. Range/on-curve failures and
/// algebraic mismatches are distinguished here for diagnostics, but callers
/// that only need a boolean accept/reject should treat any `Err` the same
/// as a `false` result (§7 policy).
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A scalar (`x` or `z`) was zero or `>= N`.
    #[error("scalar out of range")]
    InvalidInput,
    /// A coordinate was `>= P` or failed the curve equation.
    #[error("point out of range or not on curve: {0}")]
    Curve(#[from] CurveError),
    /// The recomputed Fiat–Shamir challenge did not match, or the Schnorr
    /// identities `A1 = zG - eW` / `A2 = zT - eC` failed.
    #[error("algebraic verification failed")]
    AlgebraicCheck,
}

/// How the prover's one-time nonce `k` is chosen.
pub enum NonceChoice {
    /// Uniform random `k ∈ [1, N)` via the given CSPRNG.
    Random,
    /// The deterministic construction of §4.1, derived from the witness
    /// secret and public context.
    Deterministic,
}

/// A KZG-DLEQ proof that a committed polynomial vanishes at `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DleqProof {
    /// Commitment `C = p(s)·G`.
    pub c: Point,
    /// Witness `W = q(s)·G`.
    pub w: Point,
    /// Published trusted-setup point `P = s·G`.
    pub p: Point,
    /// Schnorr commitment `A1 = k·G`.
    pub a1: Point,
    /// Schnorr commitment `A2 = k·T`.
    pub a2: Point,
    /// Public evaluation point.
    pub x: Scalar,
    /// Schnorr response `z = k + e·q(s)`.
    pub z: Scalar,
}

fn compute_t(p: &Point, x: &Scalar) -> Result<Point, ProveError> {
    let x_g = mul_generator(x)?;
    p.sub(&x_g).map_err(|_| ProveError::DegenerateSetup)
}

/// Produces a proof knowing the trusted-setup secret `s` (the "centralized"
/// path of §4.4). If `srs` is supplied, `C` and `W` are computed via SRS
/// multi-scalar-multiplication (`srs::commit`) instead of directly scaling
/// the generator by `p(s)`/`q(s)` — useful when a precomputed SRS is
/// available and MSM is cheaper than repeated point doublings for large
/// degree. The response `z` always needs the raw scalar `q(s)`, so `s`
/// itself is required regardless of whether an SRS is passed.
///
/// Fails with [`ProveError::PolynomialNonZero`] if `p(x) != 0`, or
/// [`ProveError::DegenerateSetup`] if `s = 0` or `s = x`.
pub fn prove_with_secret(
    poly: &Polynomial,
    x: &Scalar,
    s: &Scalar,
    srs: Option<&[Point]>,
    nonce_choice: NonceChoice,
    rng: &mut impl rand::RngCore,
) -> Result<DleqProof, ProveError> {
    if !x.is_in_nonzero_range() {
        return Err(ProveError::InvalidInput);
    }
    if s.is_zero() {
        return Err(ProveError::DegenerateSetup);
    }
    if s == x {
        return Err(ProveError::DegenerateSetup);
    }
    if !poly.vanishes_at(x) {
        return Err(ProveError::PolynomialNonZero);
    }

    let q = poly.divide_by_root(x)?;
    let qs = q.evaluate(s);

    let (c, w, p_point) = match srs {
        Some(srs_powers) => {
            let c = srs::commit(poly.coeffs(), srs_powers)?;
            let w = srs::commit(q.coeffs(), srs_powers)?;
            let p_point = mul_generator(s)?;
            (c, w, p_point)
        }
        None => {
            let ps = poly.evaluate(s);
            let c = mul_generator(&ps)?;
            let w = mul_generator(&qs)?;
            let p_point = mul_generator(s)?;
            (c, w, p_point)
        }
    };
    let t = compute_t(&p_point, x)?;

    let k = match nonce_choice {
        NonceChoice::Random => Scalar::random(rng),
        NonceChoice::Deterministic => {
            let parts = [
                NonceContextPart::Scalar(x),
                NonceContextPart::Scalar(&p_point.x_scalar()),
                NonceContextPart::Scalar(&p_point.y_scalar()),
                NonceContextPart::Scalar(&c.x_scalar()),
                NonceContextPart::Scalar(&w.x_scalar()),
            ];
            crate::curve::deterministic_nonce(&qs, &parts)
        }
    };

    let a1 = mul_generator(&k)?;
    let a2 = t.scalar_mul(&k)?;

    let a1_addr = crate::curve::ec_address(&a1);
    let a2_addr = crate::curve::ec_address(&a2);
    let e = build_challenge(&c, &w, &p_point, &a1_addr, &a2_addr, x);
    let z = k.add(&e.mul(&qs));

    debug!("produced KZG-DLEQ proof");
    Ok(DleqProof {
        c,
        w,
        p: p_point,
        a1,
        a2,
        x: x.clone(),
        z,
    })
}

/// Verifies a [`DleqProof`]. Returns `Ok(())` on acceptance; any `Err`
/// (range, curve, or algebraic) must be treated as rejection (§7 policy:
/// range/on-curve and algebraic failures both mean the proof is invalid).
pub fn verify(proof: &DleqProof) -> Result<(), VerifyError> {
    if !proof.x.is_in_nonzero_range() || !proof.z.is_in_nonzero_range() {
        return Err(VerifyError::InvalidInput);
    }
    // Points are already range/curve-checked at construction time (they
    // cannot be built otherwise), but a proof decoded from untrusted bytes
    // must have gone through `Point::from_be_bytes` first; re-validating
    // here would require raw coordinates, which `DleqProof` does not carry
    // — callers decoding from the wire must use `Point::from_be_bytes` for
    // each field before building a `DleqProof`.

    let t = proof.p.sub(&mul_generator(&proof.x)?)?;

    let a1_addr = crate::curve::ec_address(&proof.a1);
    let a2_addr = crate::curve::ec_address(&proof.a2);
    let e = build_challenge(&proof.c, &proof.w, &proof.p, &a1_addr, &a2_addr, &proof.x);

    let zg = mul_generator(&proof.z)?;
    let ew = proof.w.scalar_mul(&e)?;
    let lhs1 = zg.sub(&ew)?;
    if lhs1 != proof.a1 {
        warn!("KZG-DLEQ verification failed: A1 mismatch");
        return Err(VerifyError::AlgebraicCheck);
    }

    let zt = t.scalar_mul(&proof.z)?;
    let ec = proof.c.scalar_mul(&e)?;
    let lhs2 = zt.sub(&ec)?;
    if lhs2 != proof.a2 {
        warn!("KZG-DLEQ verification failed: A2 mismatch");
        return Err(VerifyError::AlgebraicCheck);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use rand::rngs::OsRng;

    fn s(v: u64) -> Scalar {
        Scalar::from(v)
    }

    fn neg(v: u64) -> Scalar {
        let n = crate::curve::group_order();
        Scalar::from_biguint_mod(&n - BigUint::from(v))
    }

    #[test]
    fn scenario_1_from_spec() {
        // s=12345, x=5, w=7, p(t) = -35 + 7t.
        let secret = s(12345);
        let x = s(5);
        let poly = Polynomial::new(vec![neg(35), s(7)]).unwrap();
        let mut rng = OsRng;
        let proof = prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap();
        verify(&proof).expect("valid proof must verify");

        let mut mutated = proof.clone();
        mutated.z = mutated.z.add(&Scalar::one());
        assert!(verify(&mutated).is_err());
    }

    #[test]
    fn scenario_2_x_equals_n_minus_1() {
        let n = crate::curve::group_order();
        let x = Scalar::from_biguint_mod(&n - BigUint::from(1u8));
        let secret = s(999_983);
        // p(t) = -(N-1) + t, vanishes at t = N-1 = x.
        let neg_x = x.clone();
        let neg_x_negated = Scalar::zero().sub(&neg_x);
        let poly = Polynomial::new(vec![neg_x_negated, s(1)]).unwrap();
        assert!(poly.vanishes_at(&x));
        let mut rng = OsRng;
        let proof = prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap();
        verify(&proof).unwrap();
    }

    #[test]
    fn scenario_3_degenerate_setup_when_s_equals_x() {
        let secret = s(12345);
        let x = s(12345);
        let poly = Polynomial::new(vec![neg(35), s(7)]).unwrap();
        let mut rng = OsRng;
        let err = prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap_err();
        assert!(matches!(err, ProveError::DegenerateSetup));
    }

    #[test]
    fn deterministic_nonce_path_also_verifies() {
        let secret = s(12345);
        let x = s(5);
        let poly = Polynomial::new(vec![neg(35), s(7)]).unwrap();
        let mut rng = OsRng;
        let proof =
            prove_with_secret(&poly, &x, &secret, None, NonceChoice::Deterministic, &mut rng).unwrap();
        verify(&proof).unwrap();
    }

    #[test]
    fn rejects_non_vanishing_polynomial() {
        let secret = s(12345);
        let x = s(5);
        let poly = Polynomial::new(vec![s(1), s(1)]).unwrap(); // p(5) = 6 != 0
        let mut rng = OsRng;
        let err = prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap_err();
        assert!(matches!(err, ProveError::PolynomialNonZero));
    }

    #[test]
    fn mutating_c_breaks_verification() {
        let secret = s(12345);
        let x = s(5);
        let poly = Polynomial::new(vec![neg(35), s(7)]).unwrap();
        let mut rng = OsRng;
        let proof = prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap();
        let mut mutated = proof.clone();
        mutated.c = mutated.c.add(&Point::generator()).unwrap();
        assert!(verify(&mutated).is_err());
    }

    #[test]
    fn srs_commit_path_matches_direct_path() {
        let secret = s(12345);
        let x = s(5);
        let poly = Polynomial::new(vec![neg(35), s(7)]).unwrap();
        let srs_powers = crate::srs::generate_centralized_srs(&secret, 4).unwrap();
        let mut rng = OsRng;
        let proof =
            prove_with_secret(&poly, &x, &secret, Some(&srs_powers), NonceChoice::Random, &mut rng)
                .unwrap();
        verify(&proof).expect("SRS-based proof must verify");
    }
}
