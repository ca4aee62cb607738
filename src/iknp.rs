//! IKNP random-OT extension: `k` base OTs amplified into `n` random OTs via
//! a bit-matrix transpose trick (§4.9).
//!
//! Roles are reversed from the base OT's naming: the IKNP **sender** plays
//! the base-OT **receiver** role (using its `k`-bit selector as the choice
//! bits), and the IKNP **receiver** plays the base-OT **sender** role (its
//! messages are the two candidate columns of its random matrix). This is
//! the standard IKNP construction; see [`crate::ot`] for the base
//! primitive.

use crate::bits::{BitMatrix, BitVector, BitsError};
use crate::curve::{keccak256, CurveError, Point};
use crate::ot::{receiver_decrypt, sender_encrypt, OtCiphertext, OtError, OtReceiverState, OtSenderParams};
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

/// Errors from the IKNP extension.
#[derive(Debug, Error)]
pub enum IknpError {
    /// A base-OT call failed (MAC failure, curve error, length mismatch).
    #[error("base OT error: {0}")]
    Ot(#[from] OtError),
    /// A bit-container operation failed.
    #[error("bit container error: {0}")]
    Bits(#[from] BitsError),
    /// A curve operation on a base-OT public key failed.
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    /// A caller-supplied array had the wrong length for the configured
    /// `k`/`n`.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
}

/// Tuning/security parameters: `k` base OTs (security parameter, typically
/// 128), amplified to `n` random OTs.
#[derive(Debug, Clone, Copy)]
pub struct IknpParams {
    /// Security parameter / base-OT count / matrix column count.
    pub k: usize,
    /// Target random-OT count / matrix row count.
    pub n: usize,
    /// Row-block size used when deriving per-row keys, purely a
    /// cache-locality tuning knob — never changes the produced keys.
    pub block_rows: usize,
}

impl IknpParams {
    /// Builds params with the default `block_rows = 512`.
    pub fn new(k: usize, n: usize) -> Self {
        IknpParams { k, n, block_rows: 512 }
    }
}

/// Number of row-blocks of size `b_blk` needed to cover `n_rows`, per the
/// teacher's `block_count`/`block_bounds` tiling idiom (`stream.rs`).
#[inline]
fn block_count(n_rows: usize, b_blk: usize) -> usize {
    (n_rows + b_blk - 1) / b_blk
}

/// Half-open row bounds `[start, end)` for block `t`.
#[inline]
fn block_bounds(t: usize, n_rows: usize, b_blk: usize) -> (usize, usize) {
    let start = t * b_blk;
    let end = ((t + 1) * b_blk).min(n_rows);
    (start, end)
}

/// The IKNP sender's state between round 1 and round 2.
pub struct IknpSender {
    choices: BitVector,
    base_states: Vec<OtReceiverState>,
}

impl IknpSender {
    /// Round 1: samples the `k`-bit selector vector `c` and runs `k` base
    /// OTs as receiver, choosing `c[j]` against each supplied base-OT
    /// sender public key. Returns the new state plus the `k` public points
    /// to send back to the IKNP receiver.
    pub fn round1(
        params: IknpParams,
        base_sender_pubs: &[Point],
        rng: &mut impl RngCore,
    ) -> Result<(Self, Vec<Point>), IknpError> {
        if base_sender_pubs.len() != params.k {
            return Err(IknpError::LengthMismatch {
                expected: params.k,
                got: base_sender_pubs.len(),
            });
        }
        let choices = BitVector::random(params.k, rng);
        let mut states = Vec::with_capacity(params.k);
        let mut pubs = Vec::with_capacity(params.k);
        for j in 0..params.k {
            let bit = choices.get(j)?;
            let state = OtReceiverState::init(bit, &base_sender_pubs[j], rng)?;
            pubs.push(state.public().clone());
            states.push(state);
        }
        debug!(k = params.k, "IKNP sender round 1 complete");
        Ok((IknpSender { choices, base_states: states }, pubs))
    }

    /// Round 2: decrypts the `k` base-OT ciphertexts to recover column `j`
    /// of `Q`, then derives `k0[i]`/`k1[i]` for every row.
    pub fn round2(
        self,
        params: IknpParams,
        base_sender_pubs: &[Point],
        cts: &[OtCiphertext],
    ) -> Result<IknpSenderOutput, IknpError> {
        if base_sender_pubs.len() != params.k || cts.len() != params.k {
            return Err(IknpError::LengthMismatch {
                expected: params.k,
                got: base_sender_pubs.len().min(cts.len()),
            });
        }
        let mut q = BitMatrix::zeros(params.n, params.k);
        for j in 0..params.k {
            let col_bytes = receiver_decrypt(&self.base_states[j], &base_sender_pubs[j], &cts[j])?;
            let col = BitVector::from_bytes(params.n, col_bytes)?;
            q.set_column(j, &col)?;
        }
        let mut k0 = vec![[0u8; 32]; params.n];
        let mut k1 = vec![[0u8; 32]; params.n];
        let b_cnt = block_count(params.n, params.block_rows);
        for t in 0..b_cnt {
            let (start, end) = block_bounds(t, params.n, params.block_rows);
            for i in start..end {
                let row = q.row(i)?;
                k0[i] = keccak256(row.as_bytes());
                let row_xor_c = row.xor(&self.choices)?;
                k1[i] = keccak256(row_xor_c.as_bytes());
            }
        }
        debug!(n = params.n, block_rows = params.block_rows, "IKNP sender round 2 complete");
        Ok(IknpSenderOutput { k0, k1 })
    }
}

/// The IKNP sender's final output: candidate key pairs for each of the `n`
/// extended OTs.
pub struct IknpSenderOutput {
    /// `k0[i]` is the key the receiver gets if `r[i] = 0`.
    pub k0: Vec<[u8; 32]>,
    /// `k1[i]` is the key the receiver gets if `r[i] = 1`.
    pub k1: Vec<[u8; 32]>,
}

/// The IKNP receiver's state after round 1.
pub struct IknpReceiverRound1 {
    base_senders: Vec<OtSenderParams>,
    t: BitMatrix,
    r: BitVector,
    block_rows: usize,
}

impl IknpReceiverRound1 {
    /// Round 1: generates `k` independent base-OT sender key pairs, the
    /// random `n x k` matrix `T`, and the `n`-bit choice vector `r` (or uses
    /// a caller-supplied `r`, e.g. a ROLE bit decomposition).
    pub fn generate(
        params: IknpParams,
        r: Option<BitVector>,
        rng: &mut impl RngCore,
    ) -> Result<Self, IknpError> {
        let base_senders = (0..params.k)
            .map(|_| OtSenderParams::generate(rng).map_err(IknpError::from))
            .collect::<Result<Vec<_>, _>>()?;
        let t = BitMatrix::random(params.n, params.k, None, rng);
        let r = match r {
            Some(r) if r.len() == params.n => r,
            Some(r) => {
                return Err(IknpError::LengthMismatch {
                    expected: params.n,
                    got: r.len(),
                })
            }
            None => BitVector::random(params.n, rng),
        };
        Ok(IknpReceiverRound1 { base_senders, t, r, block_rows: params.block_rows })
    }

    /// The `k` base-OT sender public keys to send to the IKNP sender.
    pub fn base_sender_pubs(&self) -> Vec<Point> {
        self.base_senders.iter().map(|s| s.public().clone()).collect()
    }

    /// The receiver's choice vector `r`.
    pub fn choices(&self) -> &BitVector {
        &self.r
    }

    /// Round 2: encrypts `(T[j], T[j] ⊕ r)` for each column `j` under the
    /// base-OT public keys the IKNP sender returned, and derives the
    /// receiver's final keys `Keccak256(row_i(T))`.
    pub fn round2(
        &self,
        base_receiver_pubs: &[Point],
        rng: &mut impl RngCore,
    ) -> Result<(Vec<OtCiphertext>, Vec<[u8; 32]>), IknpError> {
        if base_receiver_pubs.len() != self.base_senders.len() {
            return Err(IknpError::LengthMismatch {
                expected: self.base_senders.len(),
                got: base_receiver_pubs.len(),
            });
        }
        let t_prime = self.t.xor_columns(&self.r)?;
        let mut cts = Vec::with_capacity(self.base_senders.len());
        for j in 0..self.base_senders.len() {
            let t_col = self.t.column(j)?;
            let t_prime_col = t_prime.column(j)?;
            let ct = sender_encrypt(
                &self.base_senders[j],
                &base_receiver_pubs[j],
                t_col.as_bytes(),
                t_prime_col.as_bytes(),
                rng,
            )?;
            cts.push(ct);
        }
        let n_rows = self.t.rows();
        let mut keys = vec![[0u8; 32]; n_rows];
        let b_cnt = block_count(n_rows, self.block_rows);
        for t in 0..b_cnt {
            let (start, end) = block_bounds(t, n_rows, self.block_rows);
            for i in start..end {
                let row = self.t.row(i)?;
                keys[i] = keccak256(row.as_bytes());
            }
        }
        debug!(n = n_rows, block_rows = self.block_rows, "IKNP receiver round 2 complete");
        Ok((cts, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    /// Runs the full two-party protocol in-process (no transport layer, per
    /// the crate's explicit Non-goal on node/party transport).
    fn run(params: IknpParams) -> (IknpSenderOutput, BitVector, Vec<[u8; 32]>) {
        let mut rng = OsRng;
        let receiver_r1 = IknpReceiverRound1::generate(params, None, &mut rng).unwrap();
        let base_sender_pubs = receiver_r1.base_sender_pubs();
        let (sender, base_receiver_pubs) = IknpSender::round1(params, &base_sender_pubs, &mut rng).unwrap();
        let (cts, receiver_keys) = receiver_r1.round2(&base_receiver_pubs, &mut rng).unwrap();
        let sender_output = sender.round2(params, &base_receiver_pubs, &cts).unwrap();
        (sender_output, receiver_r1.choices().clone(), receiver_keys)
    }

    #[test]
    fn sender_key_matches_receiver_key_for_every_row() {
        let params = IknpParams::new(16, 32);
        let (sender_output, r, receiver_keys) = run(params);
        for i in 0..params.n {
            let expected = if r.get(i).unwrap() { sender_output.k1[i] } else { sender_output.k0[i] };
            assert_eq!(expected, receiver_keys[i], "row {i} key mismatch");
        }
    }

    #[test]
    fn scenario_5_from_spec_k128_n256() {
        let params = IknpParams::new(128, 256);
        let (sender_output, r, receiver_keys) = run(params);
        for i in 0..params.n {
            let expected = if r.get(i).unwrap() { sender_output.k1[i] } else { sender_output.k0[i] };
            assert_eq!(expected, receiver_keys[i]);
        }
    }
}
