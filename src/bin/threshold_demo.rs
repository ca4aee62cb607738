//! In-process N-node threshold proving demo (§4.13).
//!
//! Splits a trusted-setup secret into an `n`-way additive SRS sharing, runs
//! either the interactive two-round protocol or the single-round VOLE-
//! masked variant entirely in-process (no network transport, per §4.6/§4.7
//! non-goals), and verifies the resulting proof exactly as a single-prover
//! proof would be verified.

#![forbid(unsafe_code)]

use std::env;

use kzgdleq::curve::Scalar;
use kzgdleq::kzg::verify;
use kzgdleq::poly::Polynomial;
use kzgdleq::role::RoleParams;
use kzgdleq::srs::generate_shared_srs;
use kzgdleq::threshold::{simulate_interactive, simulate_vole};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_u64(s: &str) -> anyhow::Result<u64> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("expected an unsigned integer, got `{}`", s))
}

fn parse_poly(s: &str) -> anyhow::Result<Polynomial> {
    let n = kzgdleq::curve::group_order();
    let mut coeffs = Vec::new();
    for tok in s.split(',') {
        let tok = tok.trim();
        if tok.is_empty() {
            continue;
        }
        if let Some(stripped) = tok.strip_prefix('-') {
            let v: u64 = stripped
                .parse()
                .map_err(|_| anyhow::anyhow!("bad coefficient token `{}`", tok))?;
            coeffs.push(Scalar::from_biguint_mod(&n - num_bigint::BigUint::from(v)));
        } else {
            coeffs.push(Scalar::from(parse_u64(tok)?));
        }
    }
    Polynomial::new(coeffs).map_err(|e| anyhow::anyhow!("empty polynomial: {e}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let nodes = parse_u64(&parse_flag(&args, "--nodes").unwrap_or_else(|| "4".to_string()))? as usize;
    let secret = Scalar::from(parse_u64(
        &parse_flag(&args, "--secret").unwrap_or_else(|| "777777777".to_string()),
    )?);
    let x = Scalar::from(parse_u64(&parse_flag(&args, "--x").unwrap_or_else(|| "5".to_string()))?);
    let poly_str = parse_flag(&args, "--poly").unwrap_or_else(|| "-35,7".to_string());
    let poly = parse_poly(&poly_str)?;
    let vole = parse_flag(&args, "--mode").as_deref() == Some("vole");

    eprintln!(
        "threshold demo: {} nodes, mode={}, degree={}",
        nodes,
        if vole { "vole" } else { "interactive" },
        poly.degree()
    );

    let mut rng = rand::rngs::OsRng;
    let shares = generate_shared_srs(nodes, poly.degree(), &secret, &mut rng)
        .map_err(|e| anyhow::anyhow!("SRS sharing failed: {e}"))?;
    let p_point = kzgdleq::curve::mul_generator(&secret)?;

    let proof = if vole {
        let role_params = RoleParams::new(nodes, 32, 128)
            .map_err(|e| anyhow::anyhow!("ROLE params invalid: {e}"))?;
        simulate_vole(&poly, &x, &p_point, &shares, role_params, &mut rng)
            .map_err(|e| anyhow::anyhow!("VOLE threshold proving failed: {e}"))?
    } else {
        simulate_interactive(&poly, &x, &p_point, &shares)
            .map_err(|e| anyhow::anyhow!("interactive threshold proving failed: {e}"))?
    };

    match verify(&proof) {
        Ok(()) => {
            println!("✓ aggregate proof verifies ({} nodes)", nodes);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ aggregate proof rejected: {}", e);
            std::process::exit(1);
        }
    }
}
