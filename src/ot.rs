//! Chou–Orlandi 1-of-2 oblivious transfer, base case, over secp256k1.
//!
//! ```text
//! ⚠️  A sender key pair (a, A=a·G) and a receiver choice pair (b, B) must
//! ⚠️  never be reused across more than one OT: reusing them lets either
//! ⚠️  party correlate transcripts across transfers and, for the receiver,
//! ⚠️  can leak the sender's secret `a` if `B` is replayed against distinct
//! ⚠️  encryptions.
//! ```
//!
//! This is the base OT that [`crate::iknp`] amplifies into many random OTs.

use crate::curve::{ecdh, hkdf_keccak_expand, keccak256, mul_generator, CurveError, Point, Scalar};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

const KEY_DERIVATION_INFO: &[u8] = b"ot-key-derivation";

/// Errors from the base OT protocol.
#[derive(Debug, Error)]
pub enum OtError {
    /// A point supplied by a peer was off-curve or out of range.
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    /// The two messages in a sender encryption had different lengths.
    #[error("length mismatch: {a} vs {b}")]
    LengthMismatch {
        /// Length of the first message.
        a: usize,
        /// Length of the second message.
        b: usize,
    },
    /// Ciphertext tag verification failed; abort, do not decrypt.
    #[error("MAC verification failed")]
    MacFailed,
}

/// The sender's long-term OT key pair, `a ∈ [1, N)`, `A = a·G`. Read-only
/// once constructed.
#[derive(Debug, Clone)]
pub struct OtSenderParams {
    a: Scalar,
    a_pub: Point,
}

impl OtSenderParams {
    /// Samples a fresh sender key pair.
    pub fn generate(rng: &mut impl RngCore) -> Result<Self, OtError> {
        let a = Scalar::random(rng);
        let a_pub = mul_generator(&a)?;
        Ok(OtSenderParams { a, a_pub })
    }

    /// The sender's public key `A`.
    pub fn public(&self) -> &Point {
        &self.a_pub
    }
}

/// The receiver's per-transfer state: its choice bit and the scalar/point
/// pair sent to the sender.
#[derive(Debug, Clone)]
pub struct OtReceiverState {
    choice: bool,
    b: Scalar,
    b_pub: Point,
}

impl OtReceiverState {
    /// `B_i = b_i·G` if `choice = 0`, else `A + b_i·G`.
    pub fn init(choice: bool, sender_pub: &Point, rng: &mut impl RngCore) -> Result<Self, OtError> {
        let b = Scalar::random(rng);
        let bg = mul_generator(&b)?;
        let b_pub = if choice { sender_pub.add(&bg)? } else { bg };
        Ok(OtReceiverState { choice, b, b_pub })
    }

    /// The point sent to the sender.
    pub fn public(&self) -> &Point {
        &self.b_pub
    }

    /// The receiver's choice bit.
    pub fn choice(&self) -> bool {
        self.choice
    }
}

/// The sender's encryption of both branch messages for one OT.
#[derive(Debug, Clone)]
pub struct OtCiphertext {
    nonce0: [u8; 12],
    ct0: Vec<u8>,
    tag0: [u8; 32],
    nonce1: [u8; 12],
    ct1: Vec<u8>,
    tag1: [u8; 32],
}

fn derive_keys(shared_x: &[u8; 32]) -> ([u8; 32], [u8; 32]) {
    let okm = hkdf_keccak_expand(shared_x, &[], KEY_DERIVATION_INFO, 64);
    let mut cipher_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    cipher_key.copy_from_slice(&okm[..32]);
    mac_key.copy_from_slice(&okm[32..]);
    (cipher_key, mac_key)
}

fn encrypt_branch(
    shared_x: &[u8; 32],
    message: &[u8],
    rng: &mut impl RngCore,
) -> (Vec<u8>, [u8; 12], [u8; 32]) {
    let (cipher_key, mac_key) = derive_keys(shared_x);
    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);
    let mut buf = message.to_vec();
    let mut cipher = ChaCha20::new((&cipher_key).into(), (&nonce).into());
    cipher.apply_keystream(&mut buf);
    let mut tag_input = Vec::with_capacity(32 + 12 + buf.len());
    tag_input.extend_from_slice(&mac_key);
    tag_input.extend_from_slice(&nonce);
    tag_input.extend_from_slice(&buf);
    let tag = keccak256(&tag_input);
    (buf, nonce, tag)
}

fn decrypt_branch(shared_x: &[u8; 32], nonce: &[u8; 12], ct: &[u8], tag: &[u8; 32]) -> Result<Vec<u8>, OtError> {
    let (cipher_key, mac_key) = derive_keys(shared_x);
    let mut tag_input = Vec::with_capacity(32 + 12 + ct.len());
    tag_input.extend_from_slice(&mac_key);
    tag_input.extend_from_slice(nonce);
    tag_input.extend_from_slice(ct);
    let expected = keccak256(&tag_input);
    if expected.ct_eq(tag).unwrap_u8() != 1 {
        return Err(OtError::MacFailed);
    }
    let mut buf = ct.to_vec();
    let mut cipher = ChaCha20::new((&cipher_key).into(), nonce.into());
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

/// Sender-side encryption of one OT: validates the receiver's point,
/// derives both branch keys via ECDH, and encrypts `m0`/`m1` (which must be
/// equal length) under ChaCha20 with a Keccak-256 MAC.
pub fn sender_encrypt(
    sender: &OtSenderParams,
    receiver_pub: &Point,
    m0: &[u8],
    m1: &[u8],
    rng: &mut impl RngCore,
) -> Result<OtCiphertext, OtError> {
    if m0.len() != m1.len() {
        return Err(OtError::LengthMismatch { a: m0.len(), b: m1.len() });
    }
    let b_minus_a = receiver_pub.sub(sender.public())?;
    let s0 = ecdh(&sender.a, receiver_pub)?;
    let s1 = ecdh(&sender.a, &b_minus_a)?;
    let (ct0, nonce0, tag0) = encrypt_branch(&s0, m0, rng);
    let (ct1, nonce1, tag1) = encrypt_branch(&s1, m1, rng);
    Ok(OtCiphertext {
        nonce0,
        ct0,
        tag0,
        nonce1,
        ct1,
        tag1,
    })
}

/// Receiver-side decryption: recovers `m_{choice}`, verifying the MAC in
/// constant time before decrypting. Returns [`OtError::MacFailed`] on a bad
/// tag.
pub fn receiver_decrypt(
    state: &OtReceiverState,
    sender_pub: &Point,
    ct: &OtCiphertext,
) -> Result<Vec<u8>, OtError> {
    let s_b = ecdh(&state.b, sender_pub)?;
    if state.choice {
        decrypt_branch(&s_b, &ct.nonce1, &ct.ct1, &ct.tag1)
    } else {
        decrypt_branch(&s_b, &ct.nonce0, &ct.ct0, &ct.tag0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn round_trip_choice_zero() {
        let mut rng = OsRng;
        let sender = OtSenderParams::generate(&mut rng).unwrap();
        let receiver = OtReceiverState::init(false, sender.public(), &mut rng).unwrap();
        let m0 = b"message-zero-....".to_vec();
        let m1 = b"message-one-.....".to_vec();
        let ct = sender_encrypt(&sender, receiver.public(), &m0, &m1, &mut rng).unwrap();
        let out = receiver_decrypt(&receiver, sender.public(), &ct).unwrap();
        assert_eq!(out, m0);
    }

    #[test]
    fn round_trip_choice_one() {
        let mut rng = OsRng;
        let sender = OtSenderParams::generate(&mut rng).unwrap();
        let receiver = OtReceiverState::init(true, sender.public(), &mut rng).unwrap();
        let m0 = b"message-zero-....".to_vec();
        let m1 = b"message-one-.....".to_vec();
        let ct = sender_encrypt(&sender, receiver.public(), &m0, &m1, &mut rng).unwrap();
        let out = receiver_decrypt(&receiver, sender.public(), &ct).unwrap();
        assert_eq!(out, m1);
    }

    #[test]
    fn tampered_tag_is_rejected() {
        let mut rng = OsRng;
        let sender = OtSenderParams::generate(&mut rng).unwrap();
        let receiver = OtReceiverState::init(false, sender.public(), &mut rng).unwrap();
        let m0 = vec![1u8; 16];
        let m1 = vec![2u8; 16];
        let mut ct = sender_encrypt(&sender, receiver.public(), &m0, &m1, &mut rng).unwrap();
        ct.tag0[0] ^= 0xFF;
        let err = receiver_decrypt(&receiver, sender.public(), &ct).unwrap_err();
        assert!(matches!(err, OtError::MacFailed));
    }

    #[test]
    fn mismatched_message_lengths_are_rejected() {
        let mut rng = OsRng;
        let sender = OtSenderParams::generate(&mut rng).unwrap();
        let receiver = OtReceiverState::init(false, sender.public(), &mut rng).unwrap();
        let err = sender_encrypt(&sender, receiver.public(), &[1, 2, 3], &[1, 2], &mut rng).unwrap_err();
        assert!(matches!(err, OtError::LengthMismatch { .. }));
    }
}
