//! Crate root: public surface and shared aliases for the KZG-DLEQ
//! zero-evaluation proof system over secp256k1.
//!
//! This module is the single canonical entry point for downstream users.
//! It re-exports the main submodules implementing each piece of the
//! protocol: curve/field primitives, bit containers, the Fiat–Shamir
//! transcript, the single-prover KZG-DLEQ scheme, SRS generation, the
//! threshold and VOLE-masked provers, the OT/IKNP/ROLE stack they're built
//! on, and the EVM calldata encoder.
//!
//! ## Invariants
//!
//! - **Curve.** All arithmetic is over secp256k1 (field prime `P`, base
//!   point subgroup order `N`). There is no pairing-friendly curve or
//!   pairing operation anywhere in this crate — KZG here is used only for
//!   its zero-evaluation special case, proved via a DLEQ Schnorr argument,
//!   not via a pairing check. We **forbid unsafe** throughout.
//!
//! - **Fiat–Shamir.** The challenge is a single fixed, bit-exact 202-byte
//!   Keccak-256 packing (§4.3), chosen so an on-chain assembly verifier can
//!   reproduce it through `ecrecover`. There is exactly one encoding, in
//!   [`transcript::build_challenge`]; no module may reimplement it.
//!
//! - **Single-use secrets.** OT and ROLE pool samples are consumed at most
//!   once; reuse across two different challenges breaks the masking
//!   scheme's security (see [`threshold`] and [`role`]).
//!
//! Each submodule owns its own `thiserror` error enum scoped to its failure
//! modes; callers that only need an accept/reject boolean should treat any
//! `Err` the same as rejection.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// secp256k1 curve/field primitives: points, scalars, Keccak-256, HKDF,
/// ECDH, and the deterministic-nonce construction.
pub mod curve;
/// Packed bit vectors and matrices used by the OT extension and ROLE.
pub mod bits;
/// Dense polynomials and synthetic division by `(X - x)`.
pub mod poly;
/// The exact 202-byte Fiat–Shamir challenge packing.
pub mod transcript;
/// Single-prover KZG-DLEQ commit/witness/proof/verify.
pub mod kzg;
/// Centralized and additively-shared structured reference strings.
pub mod srs;
/// Interactive two-round and single-round VOLE-masked threshold provers.
pub mod threshold;
/// Chou–Orlandi 1-of-2 base oblivious transfer.
pub mod ot;
/// IKNP random-OT extension.
pub mod iknp;
/// Beaver random-OT to chosen-OT transform.
pub mod beaver;
/// Random and chosen-input ROLE/OLE pools.
pub mod role;
/// EVM calldata encoder for the on-chain assembly verifier.
pub mod calldata;

pub use crate::curve::{Point, Scalar};
pub use crate::kzg::{verify, DleqProof, ProveError, VerifyError};
pub use crate::poly::Polynomial;
