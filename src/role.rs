//! Random and chosen-input ROLE (oblivious linear evaluation) pools.
//!
//! Built directly on top of [`crate::iknp`] and [`crate::beaver`]: the ROLE
//! **sender** plays the IKNP sender role (ending up with per-bit `(k0,k1)`
//! keys it uses to Beaver-mask chosen field-element pairs), and the ROLE
//! **receiver** plays the IKNP receiver role (its own bit choices are
//! exactly the bit-decomposition of its output `x`, so it always knows `x`
//! without any extra communication) (§4.11).
//!
//! Each generated sample is single-use; both pools expose a monotonic
//! `next()` that fails with [`RoleError::PoolExhausted`] once drained.

use crate::beaver::{self, BeaverError};
use crate::bits::{scalar_from_bits, BitVector, BitsError};
use crate::curve::{hkdf_keccak_expand, keccak256, Scalar};
use crate::iknp::{IknpError, IknpParams, IknpReceiverRound1, IknpSender};
use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;
use thiserror::Error;
use tracing::info;

/// Errors from ROLE pool generation and consumption.
#[derive(Debug, Error)]
pub enum RoleError {
    /// `2^bitLength >= N`, breaking injectivity into the scalar field.
    #[error("bit length {bit_length} is not injective into the scalar field")]
    NotInjective {
        /// The offending bit length.
        bit_length: usize,
    },
    /// A chosen-input `x_i` was not in `[0, 2^bitLength)`.
    #[error("chosen input out of range")]
    InvalidInput,
    /// A caller-supplied array had the wrong length.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// The pool's `nextIndex` has passed `numOLEs`.
    #[error("ROLE pool exhausted")]
    PoolExhausted,
    /// The underlying IKNP extension failed.
    #[error("IKNP error: {0}")]
    Iknp(#[from] IknpError),
    /// A bit-container operation failed.
    #[error("bit container error: {0}")]
    Bits(#[from] BitsError),
    /// The Beaver masking step failed.
    #[error("Beaver transform error: {0}")]
    Beaver(#[from] BeaverError),
}

/// ROLE pool parameters: `numOLEs` samples, each input `ℓ` bits wide
/// (`2^ℓ < N`), amplified from `k` IKNP base OTs.
#[derive(Debug, Clone, Copy)]
pub struct RoleParams {
    /// Pool size.
    pub num_oles: usize,
    /// Input bit width per OLE sample.
    pub bit_length: usize,
    /// IKNP security parameter.
    pub k: usize,
}

impl RoleParams {
    /// Builds params, checking `2^bit_length < N`.
    pub fn new(num_oles: usize, bit_length: usize, k: usize) -> Result<Self, RoleError> {
        let n = crate::curve::group_order();
        let bound = BigUint::one() << bit_length;
        if bound >= n {
            return Err(RoleError::NotInjective { bit_length });
        }
        Ok(RoleParams { num_oles, bit_length, k })
    }

    /// Total extended OTs required, `numOLEs * bitLength`.
    pub fn total_base_extended_ots(&self) -> usize {
        self.num_oles * self.bit_length
    }
}

/// The ROLE sender's precomputed pool: `(a_i, b_i)` pairs.
pub struct RoleSenderPool {
    params: RoleParams,
    a: Vec<Scalar>,
    b: Vec<Scalar>,
    next_index: usize,
}

impl RoleSenderPool {
    /// Consumes the next sample, or fails if the pool is exhausted.
    pub fn next(&mut self) -> Result<(usize, Scalar, Scalar), RoleError> {
        if self.next_index >= self.params.num_oles {
            return Err(RoleError::PoolExhausted);
        }
        let idx = self.next_index;
        self.next_index += 1;
        Ok((idx, self.a[idx].clone(), self.b[idx].clone()))
    }

    /// Remaining unconsumed samples.
    pub fn remaining(&self) -> usize {
        self.params.num_oles - self.next_index
    }
}

/// The ROLE receiver's precomputed pool: `(x_i, y_i)` pairs with
/// `y_i = a_i·x_i + b_i`.
pub struct RoleReceiverPool {
    params: RoleParams,
    x: Vec<Scalar>,
    y: Vec<Scalar>,
    next_index: usize,
}

impl RoleReceiverPool {
    /// Consumes the next sample, or fails if the pool is exhausted.
    pub fn next(&mut self) -> Result<(usize, Scalar, Scalar), RoleError> {
        if self.next_index >= self.params.num_oles {
            return Err(RoleError::PoolExhausted);
        }
        let idx = self.next_index;
        self.next_index += 1;
        Ok((idx, self.x[idx].clone(), self.y[idx].clone()))
    }

    /// Remaining unconsumed samples.
    pub fn remaining(&self) -> usize {
        self.params.num_oles - self.next_index
    }
}

fn run_generation(
    params: RoleParams,
    receiver_bits: Option<BitVector>,
    rng: &mut impl RngCore,
) -> Result<(RoleSenderPool, RoleReceiverPool), RoleError> {
    let n_t = params.total_base_extended_ots();
    let iknp_params = IknpParams::new(params.k, n_t);

    let receiver_r1 = IknpReceiverRound1::generate(iknp_params, receiver_bits, rng)?;
    let base_sender_pubs = receiver_r1.base_sender_pubs();
    let (sender, base_receiver_pubs) = IknpSender::round1(iknp_params, &base_sender_pubs, rng)?;
    let (cts, receiver_keys) = receiver_r1.round2(&base_receiver_pubs, rng)?;
    let sender_output = sender.round2(iknp_params, &base_receiver_pubs, &cts)?;

    let choice_bits = receiver_r1.choices();
    let mut xs = Vec::with_capacity(params.num_oles);
    for i in 0..params.num_oles {
        xs.push(scalar_from_bits(choice_bits, i * params.bit_length, params.bit_length)?);
    }

    let mut mask_seed_input = Vec::with_capacity(9 + 64);
    mask_seed_input.extend_from_slice(b"role-mask");
    mask_seed_input.extend_from_slice(&sender_output.k0[0]);
    mask_seed_input.extend_from_slice(&sender_output.k1[0]);
    let mask_seed = keccak256(&mask_seed_input);

    let mut a_vec = Vec::with_capacity(params.num_oles);
    let mut b_vec = Vec::with_capacity(params.num_oles);
    let mut cts_per_bit: Vec<Vec<([u8; 32], [u8; 32])>> = Vec::with_capacity(params.num_oles);

    for i in 0..params.num_oles {
        let t0 = i * params.bit_length;
        let mut a_input = Vec::with_capacity(6 + 64);
        a_input.extend_from_slice(b"role-a");
        a_input.extend_from_slice(&sender_output.k0[t0]);
        a_input.extend_from_slice(&sender_output.k1[t0]);
        let a_i = Scalar::from_be_bytes_reduced(&keccak256(&a_input));

        let mut b_i = Scalar::zero();
        let mut row_cts = Vec::with_capacity(params.bit_length);
        for j in 0..params.bit_length {
            let t = t0 + j;
            let mut info = Vec::with_capacity(8);
            info.extend_from_slice(&(i as u32).to_be_bytes());
            info.extend_from_slice(&(j as u32).to_be_bytes());
            let r_bytes = hkdf_keccak_expand(&mask_seed, &[], &info, 32);
            let r_ij = Scalar::from_be_bytes_reduced(&r_bytes);
            b_i = b_i.add(&r_ij);

            let two_j = Scalar::from_biguint_mod(BigUint::one() << j);
            let m0 = r_ij.clone();
            let m1 = r_ij.add(&a_i.mul(&two_j));

            let (ct0, ct1) = beaver::sender_mask(
                b"role-ot",
                &sender_output.k0[t],
                &sender_output.k1[t],
                &m0.to_be_bytes(),
                &m1.to_be_bytes(),
            )?;
            row_cts.push((ct0, ct1));
        }
        a_vec.push(a_i);
        b_vec.push(b_i);
        cts_per_bit.push(row_cts);
    }

    let mut y_vec = Vec::with_capacity(params.num_oles);
    for i in 0..params.num_oles {
        let t0 = i * params.bit_length;
        let mut y_i = Scalar::zero();
        for j in 0..params.bit_length {
            let t = t0 + j;
            let bit = choice_bits.get(t)?;
            let key = receiver_keys[t];
            let (ct0, ct1) = cts_per_bit[i][j];
            let ct = if bit { ct1 } else { ct0 };
            let m_bytes = beaver::receiver_unmask(b"role-ot", &key, &ct)?;
            y_i = y_i.add(&Scalar::from_be_bytes_reduced(&m_bytes));
        }
        y_vec.push(y_i);
    }

    info!(num_oles = params.num_oles, bit_length = params.bit_length, "ROLE pool generated");

    Ok((
        RoleSenderPool { params, a: a_vec, b: b_vec, next_index: 0 },
        RoleReceiverPool { params, x: xs, y: y_vec, next_index: 0 },
    ))
}

/// Generates a random-OLE pool: the receiver's `x_i` values are themselves
/// freshly sampled (reconstructed from random IKNP choice bits), not chosen
/// by the caller.
pub fn generate_random(
    params: RoleParams,
    rng: &mut impl RngCore,
) -> Result<(RoleSenderPool, RoleReceiverPool), RoleError> {
    run_generation(params, None, rng)
}

/// Generates a chosen-input-OLE pool: the receiver's `x_i` values are
/// fixed in advance by the caller (each must be in `[0, 2^bitLength)`) and
/// encoded little-endian as the IKNP choice bits.
pub fn generate_chosen(
    params: RoleParams,
    xs: &[Scalar],
    rng: &mut impl RngCore,
) -> Result<(RoleSenderPool, RoleReceiverPool), RoleError> {
    if xs.len() != params.num_oles {
        return Err(RoleError::LengthMismatch {
            expected: params.num_oles,
            got: xs.len(),
        });
    }
    let bound = BigUint::one() << params.bit_length;
    let mut bits = BitVector::zeros(params.total_base_extended_ots());
    for (i, x) in xs.iter().enumerate() {
        if x.as_biguint() >= &bound {
            return Err(RoleError::InvalidInput);
        }
        for j in 0..params.bit_length {
            let bit = x.as_biguint().bit(j as u64);
            bits.set(i * params.bit_length + j, bit)?;
        }
    }
    run_generation(params, Some(bits), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn scenario_6_random_ole_satisfies_affine_relation() {
        let params = RoleParams::new(10, 16, 32).unwrap();
        let mut rng = OsRng;
        let (mut sender, mut receiver) = generate_random(params, &mut rng).unwrap();
        for _ in 0..10 {
            let (idx_s, a, b) = sender.next().unwrap();
            let (idx_r, x, y) = receiver.next().unwrap();
            assert_eq!(idx_s, idx_r);
            assert_eq!(y, a.mul(&x).add(&b));
        }
    }

    #[test]
    fn chosen_input_reproduces_caller_values() {
        let params = RoleParams::new(4, 8, 32).unwrap();
        let mut rng = OsRng;
        let xs: Vec<Scalar> = (0..4).map(|i| Scalar::from(i as u64 * 7)).collect();
        let (mut sender, mut receiver) = generate_chosen(params, &xs, &mut rng).unwrap();
        for expected_x in xs {
            let (_, a, b) = sender.next().unwrap();
            let (_, x, y) = receiver.next().unwrap();
            assert_eq!(x, expected_x);
            assert_eq!(y, a.mul(&x).add(&b));
        }
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let params = RoleParams::new(1, 8, 32).unwrap();
        let mut rng = OsRng;
        let (mut sender, _receiver) = generate_random(params, &mut rng).unwrap();
        sender.next().unwrap();
        let err = sender.next().unwrap_err();
        assert!(matches!(err, RoleError::PoolExhausted));
    }

    #[test]
    fn bit_length_too_wide_is_rejected() {
        let err = RoleParams::new(1, 256, 32).unwrap_err();
        assert!(matches!(err, RoleError::NotInjective { .. }));
    }
}
