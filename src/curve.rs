//! secp256k1 curve, field, and scalar primitives.
//!
//! This module is the foundation every other module in the crate builds on:
//! point arithmetic, modular scalar/field arithmetic, Keccak-256, HKDF-Keccak
//! key derivation, ECDH, and the deterministic-nonce construction from
//! the external-interface section of the protocol.
//!
//! The point at infinity has no representation here. Any operation that
//! would produce it (adding a point to its negation, doubling a point with
//! `y=0`, multiplying by a scalar ≡ 0 mod N) returns [`CurveError::PointAtInfinity`].

use hkdf::Hkdf;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use sha3::{Digest, Keccak256};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors raised by curve- and field-level operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurveError {
    /// A coordinate or scalar fell outside its required range.
    #[error("value out of range")]
    OutOfRange,
    /// A claimed point does not satisfy `y^2 = x^3 + 7 mod P`.
    #[error("point not on curve")]
    NotOnCurve,
    /// The operation would have produced the point at infinity, which this
    /// crate does not represent.
    #[error("operation would yield the point at infinity")]
    PointAtInfinity,
    /// A byte slice had the wrong length for the value being decoded.
    #[error("expected {expected} bytes, got {got}")]
    BadLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length supplied.
        got: usize,
    },
}

fn p() -> &'static BigUint {
    static P: OnceLock<BigUint> = OnceLock::new();
    P.get_or_init(|| {
        BigUint::parse_bytes(
            b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
            16,
        )
        .expect("static secp256k1 field prime")
    })
}

fn n() -> &'static BigUint {
    static N: OnceLock<BigUint> = OnceLock::new();
    N.get_or_init(|| {
        BigUint::parse_bytes(
            b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
            16,
        )
        .expect("static secp256k1 group order")
    })
}

fn gx() -> &'static BigUint {
    static GX: OnceLock<BigUint> = OnceLock::new();
    GX.get_or_init(|| {
        BigUint::parse_bytes(
            b"79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798",
            16,
        )
        .expect("static secp256k1 generator x")
    })
}

fn gy() -> &'static BigUint {
    static GY: OnceLock<BigUint> = OnceLock::new();
    GY.get_or_init(|| {
        BigUint::parse_bytes(
            b"483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8",
            16,
        )
        .expect("static secp256k1 generator y")
    })
}

/// The secp256k1 coordinate field prime, P.
pub fn field_prime() -> BigUint {
    p().clone()
}

/// The secp256k1 base-point subgroup order, N.
pub fn group_order() -> BigUint {
    n().clone()
}

fn mod_reduce(a: &BigUint, m: &BigUint) -> BigUint {
    a.mod_floor(m)
}

fn mod_add(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a + b).mod_floor(m)
}

fn mod_sub(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    if a >= b {
        (a - b).mod_floor(m)
    } else {
        (m + a - b).mod_floor(m)
    }
}

fn mod_mul(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a * b).mod_floor(m)
}

/// Modular inverse via Fermat's little theorem: valid because both P and N
/// are prime. Returns `None` for `a ≡ 0 mod m`.
fn mod_inv(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = a.mod_floor(m);
    if a.is_zero() {
        return None;
    }
    let exp = m - BigUint::from(2u8);
    Some(a.modpow(&exp, m))
}

fn to_be_32(a: &BigUint) -> [u8; 32] {
    let bytes = a.to_bytes_be();
    let mut out = [0u8; 32];
    assert!(bytes.len() <= 32, "value exceeds 256 bits");
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Keccak-256 of the given bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// HKDF-Keccak256 expand-only key derivation (no extract salt beyond the
/// caller-provided one), producing `out_len` bytes.
pub fn hkdf_keccak_expand(ikm: &[u8], salt: &[u8], info: &[u8], out_len: usize) -> Vec<u8> {
    let hk = Hkdf::<Keccak256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; out_len];
    hk.expand(info, &mut okm)
        .expect("HKDF output length within Keccak-256 expand limit");
    okm
}

/// A scalar in `F_N`, the secp256k1 base-point subgroup's scalar field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar(BigUint);

impl Scalar {
    /// Wraps a `BigUint`, reducing it mod N.
    pub fn from_biguint_mod(v: BigUint) -> Self {
        Scalar(v.mod_floor(n()))
    }

    /// The zero scalar.
    pub fn zero() -> Self {
        Scalar(BigUint::zero())
    }

    /// The scalar one.
    pub fn one() -> Self {
        Scalar(BigUint::one())
    }

    /// Decodes a 32-byte big-endian value. Fails if the value is ≥ N.
    pub fn from_be_bytes_strict(bytes: &[u8]) -> Result<Self, CurveError> {
        if bytes.len() != 32 {
            return Err(CurveError::BadLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        let v = BigUint::from_bytes_be(bytes);
        if &v >= n() {
            return Err(CurveError::OutOfRange);
        }
        Ok(Scalar(v))
    }

    /// Decodes 32 big-endian bytes, reducing mod N (used for Fiat–Shamir
    /// challenge output and context encoding, which are explicitly "reduced
    /// mod N" rather than range-checked).
    pub fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        Scalar(BigUint::from_bytes_be(bytes).mod_floor(n()))
    }

    /// Big-endian 32-byte encoding.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        to_be_32(&self.0)
    }

    /// True if the scalar is in `[1, N)`, the range required of proof
    /// scalars `x` and `z`.
    pub fn is_in_nonzero_range(&self) -> bool {
        !self.0.is_zero() && &self.0 < n()
    }

    /// True if the scalar is exactly zero mod N.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Samples a uniformly random nonzero scalar in `[1, N)`.
    pub fn random(rng: &mut impl rand::RngCore) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let v = BigUint::from_bytes_be(&bytes);
            if v.is_zero() || &v >= n() {
                continue;
            }
            return Scalar(v);
        }
    }

    /// `self + other mod N`.
    pub fn add(&self, other: &Scalar) -> Scalar {
        Scalar(mod_add(&self.0, &other.0, n()))
    }

    /// `self - other mod N`.
    pub fn sub(&self, other: &Scalar) -> Scalar {
        Scalar(mod_sub(&self.0, &other.0, n()))
    }

    /// `self * other mod N`.
    pub fn mul(&self, other: &Scalar) -> Scalar {
        Scalar(mod_mul(&self.0, &other.0, n()))
    }

    /// Multiplicative inverse mod N, or `None` for the zero scalar.
    pub fn inverse(&self) -> Option<Scalar> {
        mod_inv(&self.0, n()).map(Scalar)
    }

    /// Exposes the underlying integer (for building byte contexts elsewhere
    /// in the crate, e.g. polynomial coefficients).
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar(BigUint::from(v).mod_floor(n()))
    }
}

/// An affine point `(x, y)` on secp256k1, `y^2 = x^3 + 7 mod P`. The point
/// at infinity is not representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    x: BigUint,
    y: BigUint,
}

impl Point {
    /// Builds a point from raw coordinates, checking the curve equation.
    pub fn from_coords(x: BigUint, y: BigUint) -> Result<Self, CurveError> {
        let x = x.mod_floor(p());
        let y = y.mod_floor(p());
        if &x >= p() || &y >= p() {
            return Err(CurveError::OutOfRange);
        }
        let lhs = mod_mul(&y, &y, p());
        let x3 = mod_mul(&mod_mul(&x, &x, p()), &x, p());
        let rhs = mod_add(&x3, &BigUint::from(7u8), p());
        if lhs != rhs {
            return Err(CurveError::NotOnCurve);
        }
        Ok(Point { x, y })
    }

    /// Decodes big-endian 32-byte x and y coordinates.
    pub fn from_be_bytes(x: &[u8], y: &[u8]) -> Result<Self, CurveError> {
        if x.len() != 32 || y.len() != 32 {
            return Err(CurveError::BadLength {
                expected: 32,
                got: if x.len() != 32 { x.len() } else { y.len() },
            });
        }
        Self::from_coords(BigUint::from_bytes_be(x), BigUint::from_bytes_be(y))
    }

    /// The secp256k1 base point G.
    pub fn generator() -> Self {
        Point {
            x: gx().clone(),
            y: gy().clone(),
        }
    }

    /// x-coordinate.
    pub fn x(&self) -> &BigUint {
        &self.x
    }

    /// y-coordinate.
    pub fn y(&self) -> &BigUint {
        &self.y
    }

    /// Big-endian 32-byte x-coordinate.
    pub fn x_be_bytes(&self) -> [u8; 32] {
        to_be_32(&self.x)
    }

    /// Big-endian 32-byte y-coordinate.
    pub fn y_be_bytes(&self) -> [u8; 32] {
        to_be_32(&self.y)
    }

    /// Least-significant bit of y, used for Fiat–Shamir parity packing.
    pub fn y_parity_bit(&self) -> u8 {
        (&self.y & BigUint::one() == BigUint::one()) as u8
    }

    /// The x-coordinate reinterpreted as a scalar mod N (big-endian bytes,
    /// reduced), used when a coordinate is absorbed into deterministic-nonce
    /// context per §4.1.
    pub fn x_scalar(&self) -> Scalar {
        Scalar::from_be_bytes_reduced(&self.x_be_bytes())
    }

    /// The y-coordinate reinterpreted as a scalar mod N, see [`Point::x_scalar`].
    pub fn y_scalar(&self) -> Scalar {
        Scalar::from_be_bytes_reduced(&self.y_be_bytes())
    }

    fn negate(&self) -> Point {
        Point {
            x: self.x.clone(),
            y: mod_sub(&BigUint::zero(), &self.y, p()),
        }
    }

    /// Point addition. Fails with [`CurveError::PointAtInfinity`] if the
    /// result would be the identity (adding a point to its negation).
    pub fn add(&self, other: &Point) -> Result<Point, CurveError> {
        if self.x == other.x {
            if self.y == other.y {
                return self.double();
            }
            return Err(CurveError::PointAtInfinity);
        }
        let num = mod_sub(&other.y, &self.y, p());
        let den = mod_sub(&other.x, &self.x, p());
        let inv_den = mod_inv(&den, p()).expect("den != 0 since x1 != x2");
        let slope = mod_mul(&num, &inv_den, p());
        let x3 = mod_sub(
            &mod_sub(&mod_mul(&slope, &slope, p()), &self.x, p()),
            &other.x,
            p(),
        );
        let y3 = mod_sub(&mod_mul(&slope, &mod_sub(&self.x, &x3, p()), p()), &self.y, p());
        Ok(Point { x: x3, y: y3 })
    }

    /// Point doubling. Fails if `y = 0` (the tangent is vertical, giving
    /// the point at infinity).
    pub fn double(&self) -> Result<Point, CurveError> {
        if self.y.is_zero() {
            return Err(CurveError::PointAtInfinity);
        }
        let three_x2 = mod_mul(&BigUint::from(3u8), &mod_mul(&self.x, &self.x, p()), p());
        let two_y = mod_mul(&BigUint::from(2u8), &self.y, p());
        let inv_two_y = mod_inv(&two_y, p()).expect("y != 0 checked above");
        let slope = mod_mul(&three_x2, &inv_two_y, p());
        let x3 = mod_sub(&mod_mul(&slope, &slope, p()), &mod_mul(&BigUint::from(2u8), &self.x, p()), p());
        let y3 = mod_sub(&mod_mul(&slope, &mod_sub(&self.x, &x3, p()), p()), &self.y, p());
        Ok(Point { x: x3, y: y3 })
    }

    /// Point subtraction, `self - other`.
    pub fn sub(&self, other: &Point) -> Result<Point, CurveError> {
        self.add(&other.negate())
    }

    /// Scalar multiplication `k * self` via double-and-add. Fails if `k ≡ 0
    /// mod N` (the result would be the point at infinity).
    pub fn scalar_mul(&self, k: &Scalar) -> Result<Point, CurveError> {
        if k.is_zero() {
            return Err(CurveError::PointAtInfinity);
        }
        let mut acc: Option<Point> = None;
        let mut addend = self.clone();
        let bits = k.as_biguint().bits();
        for i in 0..bits {
            if k.as_biguint().bit(i) {
                acc = Some(match acc {
                    None => addend.clone(),
                    Some(a) => a.add(&addend)?,
                });
            }
            if i + 1 < bits {
                addend = addend.double()?;
            }
        }
        acc.ok_or(CurveError::PointAtInfinity)
    }
}

/// `k * G`, the generator scalar multiplication used throughout proving and
/// verifying.
pub fn mul_generator(k: &Scalar) -> Result<Point, CurveError> {
    Point::generator().scalar_mul(k)
}

/// The lower 20 bytes of `Keccak256(uint256_be(x) ‖ uint256_be(y))`, used
/// both for Fiat–Shamir packing and as the ecrecover-style "expected
/// address" operand in on-chain point verification.
pub fn ec_address(point: &Point) -> [u8; 20] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&point.x_be_bytes());
    buf[32..].copy_from_slice(&point.y_be_bytes());
    let digest = keccak256(&buf);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}

/// Constant-time comparison of two 20-byte addresses.
pub fn addresses_equal(a: &[u8; 20], b: &[u8; 20]) -> bool {
    a.ct_eq(b).into()
}

/// `ECDH(secret, point)`: the big-endian x-coordinate of `secret * point`.
pub fn ecdh(secret: &Scalar, point: &Point) -> Result<[u8; 32], CurveError> {
    Ok(point.scalar_mul(secret)?.x_be_bytes())
}

/// One piece of deterministic-nonce context, per §4.1: scalars (32-byte
/// big-endian reduced mod N), 20-byte addresses, or UTF-8 byte strings.
pub enum NonceContextPart<'a> {
    /// A scalar, encoded as 32-byte big-endian.
    Scalar(&'a Scalar),
    /// A 20-byte address.
    Address(&'a [u8; 20]),
    /// A raw byte string (e.g. a UTF-8 literal).
    Bytes(&'a [u8]),
}

impl<'a> NonceContextPart<'a> {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            NonceContextPart::Scalar(s) => out.extend_from_slice(&s.to_be_bytes()),
            NonceContextPart::Address(a) => out.extend_from_slice(a.as_slice()),
            NonceContextPart::Bytes(b) => out.extend_from_slice(b),
        }
    }
}

/// Deterministic nonce derivation from §4.1:
///
/// ```text
/// k = 1 + (Keccak256("dleq-nonce-v1" ‖ enc32(w) ‖ enc(parts…)) mod (N−1))
/// ```
///
/// The `+1` and `mod (N-1)` guarantee `k ∈ [1, N)`.
pub fn deterministic_nonce(w: &Scalar, parts: &[NonceContextPart<'_>]) -> Scalar {
    let mut input = Vec::with_capacity(13 + 32 + parts.len() * 32);
    input.extend_from_slice(b"dleq-nonce-v1");
    input.extend_from_slice(&w.to_be_bytes());
    for part in parts {
        part.encode(&mut input);
    }
    let digest = keccak256(&input);
    let n_minus_1 = n() - BigUint::one();
    let reduced = BigUint::from_bytes_be(&digest).mod_floor(&n_minus_1);
    Scalar(reduced + BigUint::one())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve() {
        let g = Point::generator();
        assert_eq!(g.x(), gx());
        assert_eq!(g.y(), gy());
    }

    #[test]
    fn scalar_mul_by_one_is_identity() {
        let g = Point::generator();
        let one = Scalar::one();
        let g1 = g.scalar_mul(&one).unwrap();
        assert_eq!(g1, g);
    }

    #[test]
    fn scalar_mul_by_two_equals_double() {
        let g = Point::generator();
        let two = Scalar::from(2u64);
        let g2 = g.scalar_mul(&two).unwrap();
        let g_doubled = g.double().unwrap();
        assert_eq!(g2, g_doubled);
    }

    #[test]
    fn scalar_mul_by_three_equals_two_plus_one() {
        let g = Point::generator();
        let three = Scalar::from(3u64);
        let g3 = g.scalar_mul(&three).unwrap();
        let g2 = g.scalar_mul(&Scalar::from(2u64)).unwrap();
        let g3_alt = g2.add(&g).unwrap();
        assert_eq!(g3, g3_alt);
    }

    #[test]
    fn scalar_mul_by_zero_fails() {
        let g = Point::generator();
        let err = g.scalar_mul(&Scalar::zero()).unwrap_err();
        assert_eq!(err, CurveError::PointAtInfinity);
    }

    #[test]
    fn point_minus_itself_fails() {
        let g = Point::generator();
        let err = g.sub(&g).unwrap_err();
        assert_eq!(err, CurveError::PointAtInfinity);
    }

    #[test]
    fn scalar_inverse_round_trips() {
        let s = Scalar::from(12345u64);
        let inv = s.inverse().unwrap();
        let one = s.mul(&inv);
        assert_eq!(one, Scalar::one());
    }

    #[test]
    fn ec_address_is_20_bytes_of_keccak() {
        let g = Point::generator();
        let addr = ec_address(&g);
        assert_eq!(addr.len(), 20);
    }

    #[test]
    fn deterministic_nonce_is_in_range_and_stable() {
        let w = Scalar::from(7u64);
        let x = Scalar::from(5u64);
        let parts = [NonceContextPart::Scalar(&x)];
        let k1 = deterministic_nonce(&w, &parts);
        let k2 = deterministic_nonce(&w, &parts);
        assert_eq!(k1, k2);
        assert!(k1.is_in_nonzero_range());
    }

    #[test]
    fn ecdh_is_symmetric() {
        let a = Scalar::from(123u64);
        let b = Scalar::from(456u64);
        let a_pub = mul_generator(&a).unwrap();
        let b_pub = mul_generator(&b).unwrap();
        let shared1 = ecdh(&a, &b_pub).unwrap();
        let shared2 = ecdh(&b, &a_pub).unwrap();
        assert_eq!(shared1, shared2);
    }
}
