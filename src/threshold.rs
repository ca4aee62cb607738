//! Threshold KZG-DLEQ proving: the interactive two-round variant (§4.6) and
//! the single-round VOLE-masked variant (§4.7), plus an in-process N-node
//! simulation harness (§4.13) used by the `threshold-demo` binary and by
//! tests, since transport between nodes is explicitly out of scope.
//!
//! Both variants produce the same [`crate::kzg::DleqProof`] shape and verify
//! under [`crate::kzg::verify`] unchanged — the whole point of the threshold
//! construction is that the aggregate proof is indistinguishable from one
//! produced by a single prover who knew `s`.

use crate::curve::{mul_generator, CurveError, NonceContextPart, Point, Scalar};
use crate::kzg::DleqProof;
use crate::poly::{PolyError, Polynomial};
use crate::role::{RoleError, RoleReceiverPool};
use crate::transcript::build_challenge;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised during threshold round orchestration.
#[derive(Debug, Error)]
pub enum RoundError {
    /// A node's locally recomputed challenge did not match the aggregator's
    /// (Round 2 must refuse to release `z_i` in this case).
    #[error("challenge mismatch in threshold round 2")]
    ChallengeMismatch,
    /// Two VOLE shares claimed the same OLE pool index.
    #[error("duplicate OLE index {0} among threshold shares")]
    DuplicateOleIndex(usize),
    /// A VOLE share's OLE sample was consumed for a different challenge `e`
    /// than the one the aggregator derived (§4.7 reuse-safety check).
    #[error("OLE sample at index {index} was bound to a different challenge")]
    OleChallengeMismatch {
        /// The offending sample's pool index.
        index: usize,
    },
    /// At least one node share is required to aggregate.
    #[error("no node shares supplied")]
    NoShares,
    /// A curve operation failed (point-at-infinity collision).
    #[error("curve error: {0}")]
    Curve(#[from] CurveError),
    /// Synthetic division / evaluation failure.
    #[error("polynomial error: {0}")]
    Poly(#[from] PolyError),
    /// The underlying ROLE pool failed to yield a sample.
    #[error("ROLE error: {0}")]
    Role(#[from] RoleError),
}

/// Node `i`'s additive SRS share: `[s_{i,0}, ..., s_{i,d}]`, as produced by
/// [`crate::srs::generate_shared_srs`].
pub type SrsShare = Vec<Scalar>;

/// A single node's Round 1 broadcast message (§4.6).
#[derive(Debug, Clone)]
pub struct Round1Message {
    /// This node's commitment share `C_i = psShare_i · G`.
    pub c_i: Point,
    /// This node's witness share `W_i = wShare_i · G`.
    pub w_i: Point,
    /// This node's Schnorr commitment share `A1_i = k_i · G`.
    pub a1_i: Point,
    /// This node's Schnorr commitment share `A2_i = k_i · T`.
    pub a2_i: Point,
}

/// A node's private state carried from Round 1 to Round 2: its share of the
/// witness `wShare_i = q(s)` restricted to this node's column, and the
/// nonce `k_i` used to build `A1_i`/`A2_i`. Neither value is ever broadcast.
#[derive(Debug, Clone)]
pub struct NodeSecret {
    w_share: Scalar,
    k: Scalar,
}

/// Runs Round 1 for a single node holding SRS share `sigma_i`, per §4.6:
/// `psShare_i = <p, sigma_i>`, `wShare_i = <q, sigma_i[..d]>`, nonce derived
/// deterministically from the witness share and public context.
pub fn node_round1(
    poly: &Polynomial,
    x: &Scalar,
    p_point: &Point,
    t: &Point,
    sigma_i: &SrsShare,
) -> Result<(Round1Message, NodeSecret), RoundError> {
    if sigma_i.len() < poly.len() {
        return Err(RoundError::Poly(PolyError::Empty));
    }
    let q = poly.divide_by_root(x)?;

    let ps_share = inner_product(poly.coeffs(), sigma_i);
    let w_share = inner_product(q.coeffs(), &sigma_i[..q.len()]);

    let c_i = mul_generator(&ps_share)?;
    let w_i = mul_generator(&w_share)?;

    let parts = [
        NonceContextPart::Scalar(x),
        NonceContextPart::Scalar(&p_point.x_scalar()),
        NonceContextPart::Scalar(&p_point.y_scalar()),
        NonceContextPart::Scalar(&c_i.x_scalar()),
        NonceContextPart::Scalar(&w_i.x_scalar()),
    ];
    let k_i = crate::curve::deterministic_nonce(&w_share, &parts);

    let a1_i = mul_generator(&k_i)?;
    let a2_i = t.scalar_mul(&k_i)?;

    Ok((
        Round1Message { c_i, w_i, a1_i, a2_i },
        NodeSecret { w_share, k: k_i },
    ))
}

fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b.iter()).fold(Scalar::zero(), |acc, (x, y)| acc.add(&x.mul(y)))
}

fn sum_points(points: &[Point]) -> Result<Point, RoundError> {
    let mut iter = points.iter();
    let first = iter.next().ok_or(RoundError::NoShares)?.clone();
    let mut acc = first;
    for p in iter {
        acc = acc.add(p)?;
    }
    Ok(acc)
}

/// Aggregates Round 1 messages from all nodes: sums `C_i`, `W_i`, `A1_i`,
/// `A2_i`, and derives the Fiat–Shamir challenge `e` over the aggregate
/// points. Returns the aggregate points and `e`, which every node uses in
/// Round 2 to recompute `e` and check it matches before releasing `z_i`.
pub fn aggregate_round1(
    messages: &[Round1Message],
    p_point: &Point,
    x: &Scalar,
) -> Result<(Point, Point, Point, Point, Scalar), RoundError> {
    if messages.is_empty() {
        return Err(RoundError::NoShares);
    }
    let c: Vec<Point> = messages.iter().map(|m| m.c_i.clone()).collect();
    let w: Vec<Point> = messages.iter().map(|m| m.w_i.clone()).collect();
    let a1: Vec<Point> = messages.iter().map(|m| m.a1_i.clone()).collect();
    let a2: Vec<Point> = messages.iter().map(|m| m.a2_i.clone()).collect();

    let c_agg = sum_points(&c)?;
    let w_agg = sum_points(&w)?;
    let a1_agg = sum_points(&a1)?;
    let a2_agg = sum_points(&a2)?;

    let a1_addr = crate::curve::ec_address(&a1_agg);
    let a2_addr = crate::curve::ec_address(&a2_agg);
    let e = build_challenge(&c_agg, &w_agg, p_point, &a1_addr, &a2_addr, x);

    Ok((c_agg, w_agg, a1_agg, a2_agg, e))
}

/// Round 2 for a single node (§4.6): recompute `e` locally from the
/// aggregated points and refuse to release `z_i` on mismatch.
pub fn node_round2(
    secret: &NodeSecret,
    c_agg: &Point,
    w_agg: &Point,
    p_point: &Point,
    a1_agg: &Point,
    a2_agg: &Point,
    x: &Scalar,
    aggregator_e: &Scalar,
) -> Result<Scalar, RoundError> {
    let a1_addr = crate::curve::ec_address(a1_agg);
    let a2_addr = crate::curve::ec_address(a2_agg);
    let local_e = build_challenge(c_agg, w_agg, p_point, &a1_addr, &a2_addr, x);
    if &local_e != aggregator_e {
        warn!("threshold round 2: challenge mismatch, refusing to release z_i");
        return Err(RoundError::ChallengeMismatch);
    }
    Ok(secret.k.add(&aggregator_e.mul(&secret.w_share)))
}

/// Finalizes the interactive two-round protocol: sums the per-node `z_i`
/// responses and assembles the canonical [`DleqProof`].
pub fn finalize(
    c_agg: Point,
    w_agg: Point,
    p_point: Point,
    a1_agg: Point,
    a2_agg: Point,
    x: Scalar,
    z_shares: &[Scalar],
) -> DleqProof {
    let z = z_shares.iter().fold(Scalar::zero(), |acc, z_i| acc.add(z_i));
    DleqProof {
        c: c_agg,
        w: w_agg,
        p: p_point,
        a1: a1_agg,
        a2: a2_agg,
        x,
        z,
    }
}

/// Runs the full two-round interactive threshold protocol in-process for
/// `n` nodes holding a shared SRS, per §4.13 (network transport is out of
/// scope; this harness calls the per-node functions directly). Round 1 runs
/// data-parallel across nodes with `rayon`, matching §5's "independently
/// and in parallel" requirement; aggregation is a barrier.
pub fn simulate_interactive(
    poly: &Polynomial,
    x: &Scalar,
    p_point: &Point,
    shares: &[SrsShare],
) -> Result<DleqProof, RoundError> {
    let t = p_point.sub(&mul_generator(x)?).map_err(|_| RoundError::Curve(CurveError::PointAtInfinity))?;

    let round1_results: Vec<Result<(Round1Message, NodeSecret), RoundError>> = shares
        .par_iter()
        .map(|sigma_i| node_round1(poly, x, p_point, &t, sigma_i))
        .collect();

    let mut messages = Vec::with_capacity(shares.len());
    let mut secrets = Vec::with_capacity(shares.len());
    for r in round1_results {
        let (m, s) = r?;
        messages.push(m);
        secrets.push(s);
    }

    let (c_agg, w_agg, a1_agg, a2_agg, e) = aggregate_round1(&messages, p_point, x)?;
    debug!(n = shares.len(), "threshold round 1 aggregated");

    let z_shares: Vec<Scalar> = secrets
        .iter()
        .map(|secret| node_round2(secret, &c_agg, &w_agg, p_point, &a1_agg, &a2_agg, x, &e))
        .collect::<Result<_, _>>()?;

    Ok(finalize(c_agg, w_agg, p_point.clone(), a1_agg, a2_agg, x.clone(), &z_shares))
}

// ---------------------------------------------------------------------------
// VOLE-masked single-round variant (§4.7)
// ---------------------------------------------------------------------------

/// A node's single-round VOLE message: the broadcast points plus the masked
/// deltas `Δw_i = w_i - a_i`, `Δk_i = k_i - b_i`, and the OLE sample index
/// this node's mask was drawn from.
#[derive(Debug, Clone)]
pub struct VoleMessage {
    /// This node's commitment share `C_i`.
    pub c_i: Point,
    /// This node's witness share `W_i`.
    pub w_i: Point,
    /// This node's Schnorr commitment share `A1_i = k_i · G`.
    pub a1_i: Point,
    /// This node's Schnorr commitment share `A2_i = k_i · T`.
    pub a2_i: Point,
    /// `w_i - a_i mod N`, where `a_i` is this node's OLE mask.
    pub delta_w: Scalar,
    /// `k_i - b_i mod N`, where `b_i` is this node's OLE mask.
    pub delta_k: Scalar,
    /// Index into the shared ROLE pool this node's `(a_i, b_i)` came from.
    pub ole_index: usize,
}

/// Masks a node's Round 1 secret with an OLE sample whose receiver-side
/// input `x_i` the offline phase has already bound to the challenge `e`
/// that will be derived from the (e-independent) broadcast points, per
/// §4.7: `Δw_i = w_i - a_i`, `Δk_i = k_i - b_i`. This is the node's only
/// outbound message; recovering `z_i = e·w_i + k_i` needs no further
/// round-trip once the aggregator knows `e` and the matching `(x_i, y_i)`.
pub fn node_vole_mask(
    msg: Round1Message,
    secret: &NodeSecret,
    ole_index: usize,
    a_i: &Scalar,
    b_i: &Scalar,
) -> VoleMessage {
    VoleMessage {
        c_i: msg.c_i,
        w_i: msg.w_i,
        a1_i: msg.a1_i,
        a2_i: msg.a2_i,
        delta_w: secret.w_share.sub(a_i),
        delta_k: secret.k.sub(b_i),
        ole_index,
    }
}

/// Aggregates VOLE messages from all nodes into a single [`DleqProof`]
/// without a second communication round (§4.7). Sums the broadcast points
/// and derives `e` exactly as the interactive variant does (the broadcast
/// points do not depend on any OLE mask), then for each share looks up the
/// OLE sample at `ole_index` from the aggregator's receiver pool, checks
/// the sample's receiver-side `x` equals `e` (the reuse-safety condition of
/// §4.7/§5 — a sample bound to a different challenge must not be spent
/// here), and reconstructs `z_i = y_i + e·Δw_i + Δk_i`.
///
/// Fails with [`RoundError::DuplicateOleIndex`] if two shares claim the same
/// pool index, and with [`RoundError::OleChallengeMismatch`] if a sample's
/// receiver-side `x` does not equal `e`.
pub fn aggregate_vole(
    messages: &[VoleMessage],
    p_point: &Point,
    x: &Scalar,
    ole_receiver: &mut RoleReceiverPool,
) -> Result<DleqProof, RoundError> {
    if messages.is_empty() {
        return Err(RoundError::NoShares);
    }

    let mut seen_indices = std::collections::HashSet::with_capacity(messages.len());
    for m in messages {
        if !seen_indices.insert(m.ole_index) {
            return Err(RoundError::DuplicateOleIndex(m.ole_index));
        }
    }

    let c: Vec<Point> = messages.iter().map(|m| m.c_i.clone()).collect();
    let w: Vec<Point> = messages.iter().map(|m| m.w_i.clone()).collect();
    let a1: Vec<Point> = messages.iter().map(|m| m.a1_i.clone()).collect();
    let a2: Vec<Point> = messages.iter().map(|m| m.a2_i.clone()).collect();

    let c_agg = sum_points(&c)?;
    let w_agg = sum_points(&w)?;
    let a1_agg = sum_points(&a1)?;
    let a2_agg = sum_points(&a2)?;

    let a1_addr = crate::curve::ec_address(&a1_agg);
    let a2_addr = crate::curve::ec_address(&a2_agg);
    let e = build_challenge(&c_agg, &w_agg, p_point, &a1_addr, &a2_addr, x);

    let mut z = Scalar::zero();
    for m in messages {
        let (idx, recv_x, y_i) = ole_receiver.next()?;
        if idx != m.ole_index {
            return Err(RoundError::DuplicateOleIndex(idx));
        }
        if recv_x != e {
            return Err(RoundError::OleChallengeMismatch { index: idx });
        }
        // z_i = y_i + e*delta_w + delta_k
        //     = (a_i*e + b_i) + e*(w_i - a_i) + (k_i - b_i) = e*w_i + k_i
        let z_i = y_i.add(&e.mul(&m.delta_w)).add(&m.delta_k);
        z = z.add(&z_i);
    }

    Ok(DleqProof {
        c: c_agg,
        w: w_agg,
        p: p_point.clone(),
        a1: a1_agg,
        a2: a2_agg,
        x: x.clone(),
        z,
    })
}

/// Runs the single-round VOLE-masked threshold protocol in-process for `n`
/// nodes (§4.13).
///
/// The broadcast points `(C_i, W_i, A1_i, A2_i)` never depend on the OLE
/// mask, so `e` can be derived immediately from Round 1 — exactly as in the
/// interactive variant — without waiting on any node's masked message. Each
/// node's single outbound message is then its broadcast points plus a mask
/// drawn from a **chosen-input** ROLE sample whose receiver-side input is
/// fixed to that same `e` (the offline "OLE evaluated at the query point"
/// functionality of §4.7). This removes the interactive variant's Round 2
/// barrier: no node needs to see the aggregate before replying, since its
/// reply is independent of what every other node sends.
pub fn simulate_vole(
    poly: &Polynomial,
    x: &Scalar,
    p_point: &Point,
    shares: &[SrsShare],
    role_params: crate::role::RoleParams,
    rng: &mut impl rand::RngCore,
) -> Result<DleqProof, RoundError> {
    let t = p_point.sub(&mul_generator(x)?).map_err(|_| RoundError::Curve(CurveError::PointAtInfinity))?;

    let round1: Vec<(Round1Message, NodeSecret)> = shares
        .iter()
        .map(|sigma_i| node_round1(poly, x, p_point, &t, sigma_i))
        .collect::<Result<_, _>>()?;
    let just_points: Vec<Round1Message> = round1.iter().map(|(m, _)| m.clone()).collect();
    let (_, _, _, _, e) = aggregate_round1(&just_points, p_point, x)?;

    let xs = vec![e.clone(); shares.len()];
    let (mut ole_sender, mut ole_receiver) = crate::role::generate_chosen(role_params, &xs, rng)?;

    let mut messages = Vec::with_capacity(shares.len());
    for (msg, secret) in round1 {
        let (idx, a_i, b_i) = ole_sender.next()?;
        messages.push(node_vole_mask(msg, &secret, idx, &a_i, &b_i));
    }

    aggregate_vole(&messages, p_point, x, &mut ole_receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleParams;
    use crate::srs::generate_shared_srs;
    use num_bigint::BigUint;
    use rand::rngs::OsRng;

    fn s(v: u64) -> Scalar {
        Scalar::from(v)
    }

    fn random_poly_vanishing_at(x: &Scalar, degree: usize, rng: &mut impl rand::RngCore) -> Polynomial {
        // Sample random coefficients a_1..a_d, then pick a_0 = -(sum a_i x^i)
        // so the polynomial vanishes at x exactly.
        let mut coeffs = vec![Scalar::zero(); degree + 1];
        for c in coeffs.iter_mut().skip(1) {
            *c = Scalar::random(rng);
        }
        let mut sum = Scalar::zero();
        let mut x_pow = Scalar::one();
        for c in coeffs.iter().skip(1) {
            x_pow = x_pow.mul(x);
            sum = sum.add(&c.mul(&x_pow));
        }
        coeffs[0] = Scalar::zero().sub(&sum);
        Polynomial::new(coeffs).unwrap()
    }

    #[test]
    fn scenario_4_degree_99_threshold_four_nodes() {
        let mut rng = OsRng;
        let x = s(42);
        let poly = random_poly_vanishing_at(&x, 99, &mut rng);
        assert!(poly.vanishes_at(&x));

        let secret = Scalar::from_biguint_mod(BigUint::from(777_777_777u64));
        let p_point = mul_generator(&secret).unwrap();
        let shares = generate_shared_srs(4, poly.degree(), &secret, &mut rng).unwrap();

        let proof = simulate_interactive(&poly, &x, &p_point, &shares).unwrap();
        crate::kzg::verify(&proof).expect("threshold proof must verify for any n and partition of s");
    }

    #[test]
    fn threshold_verifies_for_single_node() {
        let mut rng = OsRng;
        let x = s(5);
        let neg35 = Scalar::zero().sub(&s(35));
        let poly = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let secret = s(12345);
        let p_point = mul_generator(&secret).unwrap();
        let shares = generate_shared_srs(1, poly.degree(), &secret, &mut rng).unwrap();

        let proof = simulate_interactive(&poly, &x, &p_point, &shares).unwrap();
        crate::kzg::verify(&proof).unwrap();
    }

    #[test]
    fn round2_rejects_forged_challenge() {
        let mut rng = OsRng;
        let x = s(5);
        let neg35 = Scalar::zero().sub(&s(35));
        let poly = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let secret = s(12345);
        let p_point = mul_generator(&secret).unwrap();
        let shares = generate_shared_srs(2, poly.degree(), &secret, &mut rng).unwrap();
        let t = p_point.sub(&mul_generator(&x).unwrap()).unwrap();

        let (msg0, secret0) = node_round1(&poly, &x, &p_point, &t, &shares[0]).unwrap();
        let (msg1, _secret1) = node_round1(&poly, &x, &p_point, &t, &shares[1]).unwrap();
        let (c_agg, w_agg, a1_agg, a2_agg, _e) =
            aggregate_round1(&[msg0, msg1], &p_point, &x).unwrap();

        let forged_e = Scalar::from(999u64);
        let err = node_round2(&secret0, &c_agg, &w_agg, &p_point, &a1_agg, &a2_agg, &x, &forged_e)
            .unwrap_err();
        assert!(matches!(err, RoundError::ChallengeMismatch));
    }

    #[test]
    fn vole_variant_verifies_like_the_interactive_variant() {
        let mut rng = OsRng;
        let x = s(5);
        let neg35 = Scalar::zero().sub(&s(35));
        let poly = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let secret = s(12345);
        let p_point = mul_generator(&secret).unwrap();
        let n_nodes = 3;
        let shares = generate_shared_srs(n_nodes, poly.degree(), &secret, &mut rng).unwrap();
        let role_params = RoleParams::new(n_nodes, 32, 32).unwrap();

        let proof = simulate_vole(&poly, &x, &p_point, &shares, role_params, &mut rng).unwrap();
        crate::kzg::verify(&proof).expect("VOLE-masked proof must validate under the same verifier");
    }

    #[test]
    fn vole_aggregation_rejects_sample_bound_to_a_different_challenge() {
        let mut rng = OsRng;
        let x = s(5);
        let neg35 = Scalar::zero().sub(&s(35));
        let poly = Polynomial::new(vec![neg35, s(7)]).unwrap();
        let secret = s(12345);
        let p_point = mul_generator(&secret).unwrap();
        let n_nodes = 2;
        let shares = generate_shared_srs(n_nodes, poly.degree(), &secret, &mut rng).unwrap();
        let t = p_point.sub(&mul_generator(&x).unwrap()).unwrap();

        let round1: Vec<(Round1Message, NodeSecret)> = shares
            .iter()
            .map(|sigma_i| node_round1(&poly, &x, &p_point, &t, sigma_i).unwrap())
            .collect();

        let role_params = RoleParams::new(n_nodes, 32, 32).unwrap();
        // Bind the offline OLE samples to the wrong challenge value.
        let wrong_e = Scalar::from(123_456u64);
        let xs = vec![wrong_e; n_nodes];
        let (mut ole_sender, mut ole_receiver) =
            crate::role::generate_chosen(role_params, &xs, &mut rng).unwrap();

        let messages: Vec<VoleMessage> = round1
            .into_iter()
            .map(|(msg, secret)| {
                let (idx, a_i, b_i) = ole_sender.next().unwrap();
                node_vole_mask(msg, &secret, idx, &a_i, &b_i)
            })
            .collect();

        let err = aggregate_vole(&messages, &p_point, &x, &mut ole_receiver).unwrap_err();
        assert!(matches!(err, RoundError::OleChallengeMismatch { .. }));
    }
}
