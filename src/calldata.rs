//! EVM calldata encoder for the on-chain `verifyPolynomial()` assembly
//! verifier (§4.12, §6).
//!
//! The on-chain verifier reconstructs `X = x·G`, `T = P - X`, and checks
//! `A1 = zG - eW` / `A2 = zT - eC` via `ecrecover`, using caller-supplied
//! `Hinv = (Px - Xx)^-1 mod P` and `Hinv2 = (zTx - eCx)^-1 mod P` to avoid
//! performing modular inversions in the EVM. This module computes exactly
//! those derived fields and serializes the fixed 430-byte calldata blob
//! bit-exactly — any deviation from this layout breaks on-chain
//! verification, so there is deliberately only one encoding entry point.

use crate::curve::{mul_generator, CurveError, Point, Scalar};
use crate::kzg::DleqProof;
use crate::transcript::build_challenge;
use num_bigint::BigUint;
use num_integer::Integer;
use thiserror::Error;

/// Errors from calldata encoding.
#[derive(Debug, Error)]
pub enum CalldataError {
    /// A proof scalar (`x` or `z`) was out of the required `[1, N)` range.
    #[error("scalar out of range")]
    InvalidInput,
    /// A proof point failed curve validation or range-checking.
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
}

/// `version = 1`, per §6 and Design Notes (b): a breaking change to the
/// challenge packing must bump this.
pub const VERSION: u8 = 1;

/// 4-byte selector: the first 4 bytes of `Keccak256("verifyPolynomial()")`.
pub fn selector() -> [u8; 4] {
    let digest = crate::curve::keccak256(b"verifyPolynomial()");
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// The on-chain calldata layout, after the 4-byte selector: `version`, the
/// twelve `uint256` fields in declaration order, the two 20-byte
/// addresses, and the trailing parity byte (§4.12/§6), 430 bytes total
/// including the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calldata {
    /// `version` (always 1 for this encoding).
    pub version: u8,
    /// Commitment x-coordinate.
    pub cx: [u8; 32],
    /// Witness x-coordinate.
    pub wx: [u8; 32],
    /// `X = x·G` x-coordinate.
    pub xx: [u8; 32],
    /// `X = x·G` y-coordinate.
    pub xy: [u8; 32],
    /// `(z·T)` x-coordinate.
    pub z_tx: [u8; 32],
    /// `(z·T)` y-coordinate.
    pub z_ty: [u8; 32],
    /// `(e·C)` x-coordinate.
    pub e_cx: [u8; 32],
    /// `(e·C)` y-coordinate.
    pub e_cy: [u8; 32],
    /// `(Px - Xx)^-1 mod P`, or all-zero if the inputs were invalid.
    pub hinv: [u8; 32],
    /// `(zTx - eCx)^-1 mod P`, or all-zero if the inputs were invalid.
    pub hinv2: [u8; 32],
    /// Schnorr response `z`.
    pub z: [u8; 32],
    /// Public evaluation point `x`.
    pub x: [u8; 32],
    /// `A1` address.
    pub a1_addr: [u8; 20],
    /// `A2` address.
    pub a2_addr: [u8; 20],
    /// `(Cy & 1) | ((Wy & 1) << 1)`.
    pub parity: u8,
}

fn mod_inv_p(a: &BigUint) -> Option<BigUint> {
    let p = crate::curve::field_prime();
    let a = a.mod_floor(&p);
    if a == BigUint::from(0u8) {
        return None;
    }
    let exp = &p - BigUint::from(2u8);
    Some(a.modpow(&exp, &p))
}

fn sub_mod_p(a: &BigUint, b: &BigUint) -> BigUint {
    let p = crate::curve::field_prime();
    if a >= b {
        (a - b).mod_floor(&p)
    } else {
        (&p + a - b).mod_floor(&p)
    }
}

fn be32(v: &BigUint) -> [u8; 32] {
    let bytes = v.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Encodes a [`DleqProof`] into the calldata layout of §4.12, deriving
/// `X`, `T`, `z·T`, `e·C`, `Hinv`, and `Hinv2` from the proof fields. If any
/// input is out of range or off-curve, or an inversion input is zero, the
/// derived fields are emitted as all-zero bytes rather than computed
/// invalid inversions — the contract itself is expected to reject such a
/// blob (§4.12).
pub fn encode(proof: &DleqProof) -> Result<Calldata, CalldataError> {
    if !proof.x.is_in_nonzero_range() || !proof.z.is_in_nonzero_range() {
        return Err(CalldataError::InvalidInput);
    }

    let x_point = mul_generator(&proof.x)?;
    let t = proof.p.sub(&x_point)?;

    let a1_addr = crate::curve::ec_address(&proof.a1);
    let a2_addr = crate::curve::ec_address(&proof.a2);
    let e = build_challenge(&proof.c, &proof.w, &proof.p, &a1_addr, &a2_addr, &proof.x);

    let z_t = safe_scalar_mul(&t, &proof.z);
    let e_c = safe_scalar_mul(&proof.c, &e);

    let hinv = match mod_inv_p(&sub_mod_p(proof.p.x(), x_point.x())) {
        Some(v) => be32(&v),
        None => [0u8; 32],
    };
    let hinv2 = match (&z_t, &e_c) {
        (Some(zt), Some(ec)) => match mod_inv_p(&sub_mod_p(zt.x(), ec.x())) {
            Some(v) => be32(&v),
            None => [0u8; 32],
        },
        _ => [0u8; 32],
    };

    let parity = proof.c.y_parity_bit() | (proof.w.y_parity_bit() << 1);

    Ok(Calldata {
        version: VERSION,
        cx: proof.c.x_be_bytes(),
        wx: proof.w.x_be_bytes(),
        xx: x_point.x_be_bytes(),
        xy: x_point.y_be_bytes(),
        z_tx: z_t.as_ref().map(Point::x_be_bytes).unwrap_or([0u8; 32]),
        z_ty: z_t.as_ref().map(Point::y_be_bytes).unwrap_or([0u8; 32]),
        e_cx: e_c.as_ref().map(Point::x_be_bytes).unwrap_or([0u8; 32]),
        e_cy: e_c.as_ref().map(Point::y_be_bytes).unwrap_or([0u8; 32]),
        hinv,
        hinv2,
        z: proof.z.to_be_bytes(),
        x: proof.x.to_be_bytes(),
        a1_addr,
        a2_addr,
        parity,
    })
}

/// Scalar multiplication that maps a point-at-infinity failure to `None`
/// rather than propagating an error — the calldata encoder's policy is to
/// zero-fill derived fields rather than fail outright on a degenerate
/// input, since the point of the blob is that the *contract* rejects it.
fn safe_scalar_mul(base: &Point, k: &Scalar) -> Option<Point> {
    base.scalar_mul(k).ok()
}

/// Serializes a [`Calldata`] into the exact 430-byte blob: 4-byte selector,
/// 1-byte version, twelve 32-byte words, two 20-byte addresses, 1-byte
/// parity.
pub fn to_bytes(calldata: &Calldata) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 1 + 32 * 12 + 20 * 2 + 1);
    out.extend_from_slice(&selector());
    out.push(calldata.version);
    for word in [
        &calldata.cx,
        &calldata.wx,
        &calldata.xx,
        &calldata.xy,
        &calldata.z_tx,
        &calldata.z_ty,
        &calldata.e_cx,
        &calldata.e_cy,
        &calldata.hinv,
        &calldata.hinv2,
        &calldata.z,
        &calldata.x,
    ] {
        out.extend_from_slice(word);
    }
    out.extend_from_slice(&calldata.a1_addr);
    out.extend_from_slice(&calldata.a2_addr);
    out.push(calldata.parity);
    debug_assert_eq!(out.len(), 430);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kzg::{prove_with_secret, NonceChoice};
    use crate::poly::Polynomial;
    use rand::rngs::OsRng;

    fn s(v: u64) -> Scalar {
        Scalar::from(v)
    }

    fn valid_proof() -> DleqProof {
        let secret = s(12345);
        let x = s(5);
        let n = crate::curve::group_order();
        let neg35 = Scalar::from_biguint_mod(&n - BigUint::from(35u8));
        let poly = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let mut rng = OsRng;
        prove_with_secret(&poly, &x, &secret, None, NonceChoice::Random, &mut rng).unwrap()
    }

    #[test]
    fn encoded_blob_is_exactly_430_bytes() {
        let proof = valid_proof();
        let calldata = encode(&proof).unwrap();
        let bytes = to_bytes(&calldata);
        assert_eq!(bytes.len(), 430);
        assert_eq!(&bytes[..4], &selector());
        assert_eq!(bytes[4], VERSION);
    }

    #[test]
    fn hinv_is_a_true_modular_inverse() {
        let proof = valid_proof();
        let calldata = encode(&proof).unwrap();
        let p = crate::curve::field_prime();
        let x_point = mul_generator(&proof.x).unwrap();
        let diff = sub_mod_p(proof.p.x(), x_point.x());
        let hinv = BigUint::from_bytes_be(&calldata.hinv);
        assert_eq!((diff * hinv).mod_floor(&p), BigUint::from(1u8));
    }

    #[test]
    fn rejects_out_of_range_x() {
        let mut proof = valid_proof();
        proof.x = Scalar::zero();
        let err = encode(&proof).unwrap_err();
        assert!(matches!(err, CalldataError::InvalidInput));
    }
}
