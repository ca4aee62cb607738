//! SRS (structured reference string) generation, commitment, and sharing.
//!
//! ```text
//! ██████████████████████████████████████████████████████████████████████
//! ⚠️  The secret `s` ("tau" in KZG literature) must be destroyed after a
//! ⚠️  centralized SRS is generated, or split via `generate_shared_srs` and
//! ⚠️  never reconstructed, or the zero-knowledge property of every proof
//! ⚠️  produced against this SRS is void: anyone who learns `s` can forge
//! ⚠️  proofs for any statement.
//! ██████████████████████████████████████████████████████████████████████
//! ```
//!
//! Two forms, per §4.5:
//! - **Centralized**: `srs[i] = s^i · G` for `i ∈ [0, d]`, one trusted party
//!   knows `s` (or destroys it immediately after generation).
//! - **Shared**: an `n`-way additive secret-sharing of the powers-of-s
//!   vector, so `n` nodes can jointly commit without any one of them
//!   knowing `s`.

use crate::curve::{mul_generator, Point, Scalar};
use rand::RngCore;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const FILE_MAGIC: &[u8; 8] = b"KZGDSRS\0";
const FILE_VERSION: u16 = 1;

/// Errors from SRS generation, commitment, loading, and sharing.
#[derive(Debug, Error)]
pub enum SrsError {
    /// `s ≡ 0 mod N`: the setup is degenerate, every power collapses.
    #[error("degenerate setup: secret is zero mod N")]
    DegenerateSetup,
    /// The polynomial to commit has more coefficients than the SRS has
    /// powers.
    #[error("polynomial degree exceeds SRS degree")]
    DegreeExceedsSrs,
    /// Every coefficient was zero; committing the zero polynomial is
    /// rejected outright.
    #[error("cannot commit the zero polynomial")]
    ZeroPolynomial,
    /// `n` must be at least 1 for a shared SRS.
    #[error("shared SRS requires at least one node")]
    InvalidNodeCount,
    /// I/O failure reading or writing an SRS file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file did not start with the expected magic bytes or version.
    #[error("bad SRS file header")]
    BadHeader,
    /// A point recorded in the file failed curve validation.
    #[error("invalid point in SRS file: {0}")]
    InvalidPoint(#[from] crate::curve::CurveError),
}

/// Generates the centralized SRS `[G, s·G, s^2·G, ..., s^d·G]`. Fails if
/// `s ≡ 0 mod N`.
pub fn generate_centralized_srs(s: &Scalar, degree: usize) -> Result<Vec<Point>, SrsError> {
    if s.is_zero() {
        return Err(SrsError::DegenerateSetup);
    }
    info!(degree, "generating centralized SRS");
    let mut powers = Vec::with_capacity(degree + 1);
    let mut s_pow = Scalar::one();
    for i in 0..=degree {
        powers.push(mul_generator(&s_pow).expect("s_pow != 0 by construction"));
        if i < degree {
            s_pow = s_pow.mul(s);
        }
    }
    Ok(powers)
}

/// `Commit(coeffs, srs) = Σ_i c_i · srs[i]`, skipping zero coefficients.
/// Rejects the all-zero polynomial and any polynomial longer than the SRS.
pub fn commit(coeffs: &[Scalar], srs: &[Point]) -> Result<Point, SrsError> {
    if coeffs.len() > srs.len() {
        return Err(SrsError::DegreeExceedsSrs);
    }
    let mut acc: Option<Point> = None;
    for (c, base) in coeffs.iter().zip(srs.iter()) {
        if c.is_zero() {
            continue;
        }
        let term = base.scalar_mul(c).map_err(SrsError::InvalidPoint)?;
        acc = Some(match acc {
            None => term,
            Some(a) => a.add(&term).map_err(SrsError::InvalidPoint)?,
        });
    }
    acc.ok_or(SrsError::ZeroPolynomial)
}

/// Produces an `n`-way additive sharing of the powers-of-`s` vector
/// `[s^0, ..., s^d]`: `n` row vectors of length `d+1` whose column-wise sum
/// equals the centralized powers, mod N. The last node's row is the
/// column-wise complement of the others, so no single node (other than the
/// dealer, who must then forget `s`) learns `s`.
pub fn generate_shared_srs(
    n: usize,
    degree: usize,
    s: &Scalar,
    rng: &mut impl RngCore,
) -> Result<Vec<Vec<Scalar>>, SrsError> {
    if n == 0 {
        return Err(SrsError::InvalidNodeCount);
    }
    if s.is_zero() {
        return Err(SrsError::DegenerateSetup);
    }
    let d1 = degree + 1;
    let mut powers = Vec::with_capacity(d1);
    let mut s_pow = Scalar::one();
    for i in 0..d1 {
        powers.push(s_pow.clone());
        if i + 1 < d1 {
            s_pow = s_pow.mul(s);
        }
    }

    let mut shares: Vec<Vec<Scalar>> = (0..n).map(|_| Vec::with_capacity(d1)).collect();
    if n == 1 {
        shares[0] = powers;
        return Ok(shares);
    }
    for k in 0..d1 {
        let mut running = Scalar::zero();
        for node in shares.iter_mut().take(n - 1) {
            let r = Scalar::random(rng);
            running = running.add(&r);
            node.push(r);
        }
        let last = powers[k].sub(&running);
        shares[n - 1].push(last);
    }
    debug!(n, degree, "shared SRS generated");
    Ok(shares)
}

/// Fixed-seed SRS generation for local development and tests. **Not for
/// production**: the secret is `Keccak256("kzgdleq-dev-srs-v1")` reduced
/// mod N, which is public to anyone reading this source.
#[cfg(feature = "dev-srs")]
pub fn generate_dev_srs(degree: usize) -> Vec<Point> {
    let digest = crate::curve::keccak256(b"kzgdleq-dev-srs-v1");
    let s = Scalar::from_be_bytes_reduced(&digest);
    generate_centralized_srs(&s, degree).expect("dev seed digest is nonzero mod N")
}

/// Writes a centralized SRS to disk as `MAGIC || u16 version || u32 count ||
/// (32-byte x || 32-byte y)*`.
pub fn save_srs(path: impl AsRef<Path>, srs: &[Point]) -> Result<(), SrsError> {
    let mut f = std::fs::File::create(path)?;
    f.write_all(FILE_MAGIC)?;
    f.write_all(&FILE_VERSION.to_be_bytes())?;
    f.write_all(&(srs.len() as u32).to_be_bytes())?;
    for point in srs {
        f.write_all(&point.x_be_bytes())?;
        f.write_all(&point.y_be_bytes())?;
    }
    Ok(())
}

/// Loads and validates a centralized SRS written by [`save_srs`]: every
/// point is checked to lie on the curve.
pub fn load_srs(path: impl AsRef<Path>) -> Result<Vec<Point>, SrsError> {
    let mut f = std::fs::File::open(path)?;
    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)?;
    if &magic != FILE_MAGIC {
        return Err(SrsError::BadHeader);
    }
    let mut version_bytes = [0u8; 2];
    f.read_exact(&mut version_bytes)?;
    if u16::from_be_bytes(version_bytes) != FILE_VERSION {
        return Err(SrsError::BadHeader);
    }
    let mut count_bytes = [0u8; 4];
    f.read_exact(&mut count_bytes)?;
    let count = u32::from_be_bytes(count_bytes) as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        f.read_exact(&mut x)?;
        f.read_exact(&mut y)?;
        out.push(Point::from_be_bytes(&x, &y)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::Polynomial;

    #[test]
    fn centralized_srs_first_entry_is_generator() {
        let s = Scalar::from(12345u64);
        let srs = generate_centralized_srs(&s, 4).unwrap();
        assert_eq!(srs[0], Point::generator());
    }

    #[test]
    fn zero_secret_is_rejected() {
        let err = generate_centralized_srs(&Scalar::zero(), 4).unwrap_err();
        assert!(matches!(err, SrsError::DegenerateSetup));
    }

    #[test]
    fn commit_via_srs_matches_direct_secret_evaluation() {
        let s = Scalar::from(12345u64);
        let srs = generate_centralized_srs(&s, 3).unwrap();
        let p = Polynomial::new(vec![Scalar::from(1u64), Scalar::from(2u64), Scalar::from(3u64)]).unwrap();
        let via_srs = commit(p.coeffs(), &srs).unwrap();
        let direct = mul_generator(&p.evaluate(&s)).unwrap();
        assert_eq!(via_srs, direct);
    }

    #[test]
    fn zero_polynomial_commit_is_rejected() {
        let s = Scalar::from(12345u64);
        let srs = generate_centralized_srs(&s, 2).unwrap();
        let err = commit(&[Scalar::zero(), Scalar::zero()], &srs).unwrap_err();
        assert!(matches!(err, SrsError::ZeroPolynomial));
    }

    #[test]
    fn shared_srs_columns_sum_to_centralized_powers() {
        let s = Scalar::from(777u64);
        let degree = 5;
        let mut rng = rand::rngs::OsRng;
        let shares = generate_shared_srs(4, degree, &s, &mut rng).unwrap();
        let mut s_pow = Scalar::one();
        for k in 0..=degree {
            let mut sum = Scalar::zero();
            for node in &shares {
                sum = sum.add(&node[k]);
            }
            assert_eq!(sum, s_pow);
            s_pow = s_pow.mul(&s);
        }
    }

    #[test]
    fn save_and_load_round_trips() {
        let s = Scalar::from(42u64);
        let srs = generate_centralized_srs(&s, 3).unwrap();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        save_srs(tmp.path(), &srs).unwrap();
        let loaded = load_srs(tmp.path()).unwrap();
        assert_eq!(loaded, srs);
    }
}
