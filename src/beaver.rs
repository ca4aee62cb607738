//! Beaver transform: random OT (IKNP's `k0`/`k1`, `r`/`k_r`) to chosen OT.
//!
//! Given sender keys `(k0[i], k1[i])`, the receiver's `(r[i], k_{r[i]}[i])`,
//! and a domain tag, the sender can mask *any* chosen pair of messages
//! `(m0, m1)` so that the receiver — who already holds `k_{r[i]}` from the
//! IKNP extension — recovers exactly `m_{r[i]}` (§4.10).

use crate::curve::keccak256;
use thiserror::Error;

/// Errors from the Beaver mask/unmask transform.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BeaverError {
    /// The two chosen messages had different lengths, or a message was not
    /// exactly 32 bytes (the Keccak-256 output size the mask is drawn
    /// from).
    #[error("message length {got} must equal 32 (and match across m0/m1)")]
    LengthMismatch {
        /// The offending length.
        got: usize,
    },
}

fn mask(tag: &[u8], key: &[u8; 32], len: usize) -> Result<[u8; 32], BeaverError> {
    if len != 32 {
        return Err(BeaverError::LengthMismatch { got: len });
    }
    let mut input = Vec::with_capacity(tag.len() + 32);
    input.extend_from_slice(tag);
    input.extend_from_slice(key);
    Ok(keccak256(&input))
}

fn xor32(a: &[u8], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Sender side: masks the chosen messages `m0`, `m1` (each exactly 32
/// bytes) under the random-OT keys `k0`, `k1` and the given domain tag,
/// producing `(ct0, ct1)` to send to the receiver.
pub fn sender_mask(
    tag: &[u8],
    k0: &[u8; 32],
    k1: &[u8; 32],
    m0: &[u8; 32],
    m1: &[u8; 32],
) -> Result<([u8; 32], [u8; 32]), BeaverError> {
    let mask0 = mask(tag, k0, 32)?;
    let mask1 = mask(tag, k1, 32)?;
    Ok((xor32(m0, &mask0), xor32(m1, &mask1)))
}

/// Receiver side: given its choice bit's key `k_r` and the matching
/// ciphertext, recovers `m_r` bit-exactly.
pub fn receiver_unmask(tag: &[u8], k_r: &[u8; 32], ct_r: &[u8; 32]) -> Result<[u8; 32], BeaverError> {
    let m = mask(tag, k_r, 32)?;
    Ok(xor32(ct_r, &m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receiver_recovers_chosen_branch() {
        let k0 = [1u8; 32];
        let k1 = [2u8; 32];
        let m0 = [0xAAu8; 32];
        let m1 = [0xBBu8; 32];
        let tag = b"role-ot";
        let (ct0, ct1) = sender_mask(tag, &k0, &k1, &m0, &m1).unwrap();

        let recovered0 = receiver_unmask(tag, &k0, &ct0).unwrap();
        assert_eq!(recovered0, m0);

        let recovered1 = receiver_unmask(tag, &k1, &ct1).unwrap();
        assert_eq!(recovered1, m1);
    }

    #[test]
    fn wrong_key_does_not_recover_message() {
        let k0 = [1u8; 32];
        let k1 = [2u8; 32];
        let m0 = [0xAAu8; 32];
        let m1 = [0xBBu8; 32];
        let tag = b"role-ot";
        let (ct0, _ct1) = sender_mask(tag, &k0, &k1, &m0, &m1).unwrap();
        let wrong = receiver_unmask(tag, &k1, &ct0).unwrap();
        assert_ne!(wrong, m0);
    }
}
