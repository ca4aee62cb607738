//! The Fiat–Shamir challenge transcript.
//!
//! Unlike a general-purpose domain-separated transcript (absorbing
//! arbitrarily many labeled items into a streaming hasher), this protocol's
//! challenge is a single fixed, bit-exact 202-byte packing so that an
//! on-chain assembly verifier can reproduce it through `ecrecover`. There is
//! exactly one entry point: [`build_challenge`].

use crate::curve::{keccak256, Point, Scalar};

/// `buildChallenge(Cx,Wx,Px,Py,A1addr,A2addr,x,parity) -> e`.
///
/// The hash input is exactly:
///
/// ```text
/// 0x01 ‖ uint256_be(Cx) ‖ uint256_be(Wx) ‖ uint256_be(Px) ‖ uint256_be(Py)
///      ‖ bytes20(A1addr) ‖ bytes20(A2addr) ‖ uint256_be(x) ‖ uint8(parity)
/// ```
///
/// 202 bytes total. `e = Keccak256(input) mod N`. Every prover and verifier
/// path must call this function rather than reimplement the packing —
/// deviation breaks on-chain verification.
pub fn build_challenge(
    c: &Point,
    w: &Point,
    p: &Point,
    a1_addr: &[u8; 20],
    a2_addr: &[u8; 20],
    x: &Scalar,
) -> Scalar {
    let parity = parity_byte(c, w);
    let mut input = Vec::with_capacity(202);
    input.push(0x01);
    input.extend_from_slice(&c.x_be_bytes());
    input.extend_from_slice(&w.x_be_bytes());
    input.extend_from_slice(&p.x_be_bytes());
    input.extend_from_slice(&p.y_be_bytes());
    input.extend_from_slice(a1_addr);
    input.extend_from_slice(a2_addr);
    input.extend_from_slice(&x.to_be_bytes());
    input.push(parity);
    debug_assert_eq!(input.len(), 202);
    let digest = keccak256(&input);
    Scalar::from_be_bytes_reduced(&digest)
}

/// `parity = (Cy & 1) | ((Wy & 1) << 1)`.
pub fn parity_byte(c: &Point, w: &Point) -> u8 {
    c.y_parity_bit() | (w.y_parity_bit() << 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::mul_generator;

    #[test]
    fn challenge_is_deterministic_function_of_inputs() {
        let c = mul_generator(&Scalar::from(2u64)).unwrap();
        let w = mul_generator(&Scalar::from(3u64)).unwrap();
        let p = mul_generator(&Scalar::from(5u64)).unwrap();
        let a1 = [1u8; 20];
        let a2 = [2u8; 20];
        let x = Scalar::from(7u64);
        let e1 = build_challenge(&c, &w, &p, &a1, &a2, &x);
        let e2 = build_challenge(&c, &w, &p, &a1, &a2, &x);
        assert_eq!(e1, e2);
    }

    #[test]
    fn challenge_changes_with_any_input() {
        let c = mul_generator(&Scalar::from(2u64)).unwrap();
        let w = mul_generator(&Scalar::from(3u64)).unwrap();
        let p = mul_generator(&Scalar::from(5u64)).unwrap();
        let a1 = [1u8; 20];
        let a2 = [2u8; 20];
        let x = Scalar::from(7u64);
        let e_base = build_challenge(&c, &w, &p, &a1, &a2, &x);
        let x2 = Scalar::from(8u64);
        let e_diff = build_challenge(&c, &w, &p, &a1, &a2, &x2);
        assert_ne!(e_base, e_diff);
    }
}
