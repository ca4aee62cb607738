//! Single-prover KZG-DLEQ CLI (§4.4).
//!
//! Writes a strict, versioned proof file:
//!   magic: b"KZGDLEQ\0" (8 bytes) + u16 version (=1) + the proof's seven
//!   fixed-width fields (`C`, `W`, `P`, `A1`, `A2` as 64-byte points; `x`,
//!   `z` as 32-byte scalars), 394 bytes total.

#![forbid(unsafe_code)]

use std::{env, fs, io::Write, path::Path};

use kzgdleq::curve::Scalar;
use kzgdleq::kzg::{prove_with_secret, NonceChoice};
use kzgdleq::poly::Polynomial;

const FILE_MAGIC: &[u8; 8] = b"KZGDLEQ\0";
const FILE_VERSION: u16 = 1;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_scalar(s: &str) -> anyhow::Result<Scalar> {
    let v: u64 = s
        .parse()
        .map_err(|_| anyhow::anyhow!("expected a decimal u64 scalar, got `{}`", s))?;
    Ok(Scalar::from(v))
}

fn parse_poly(s: &str) -> anyhow::Result<Polynomial> {
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
            let n = kzgdleq::curve::group_order();
            coeffs.push(Scalar::from_biguint_mod(&n - num_bigint::BigUint::from(v)));
        } else {
            coeffs.push(parse_scalar(tok)?);
        }
    }
    Polynomial::new(coeffs).map_err(|e| anyhow::anyhow!("empty polynomial: {e}"))
}

fn write_proof_file(path: &Path, proof: &kzgdleq::DleqProof) -> anyhow::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(FILE_MAGIC)?;
    f.write_all(&FILE_VERSION.to_be_bytes())?;
    for point in [&proof.c, &proof.w, &proof.p, &proof.a1, &proof.a2] {
        f.write_all(&point.x_be_bytes())?;
        f.write_all(&point.y_be_bytes())?;
    }
    f.write_all(&proof.x.to_be_bytes())?;
    f.write_all(&proof.z.to_be_bytes())?;
    f.flush().ok();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let secret_str = parse_flag(&args, "--secret")
        .ok_or_else(|| anyhow::anyhow!("--secret <u64> is required (the trusted-setup scalar s)"))?;
    let secret = parse_scalar(&secret_str)?;

    let x_str = parse_flag(&args, "--x")
        .ok_or_else(|| anyhow::anyhow!("--x <u64> is required (the public evaluation point)"))?;
    let x = parse_scalar(&x_str)?;

    let poly_str = parse_flag(&args, "--poly").ok_or_else(|| {
        anyhow::anyhow!("--poly <c0,c1,...> is required (ascending coefficients; prefix a negative literal with '-')")
    })?;
    let poly = parse_poly(&poly_str)?;

    let deterministic = parse_flag(&args, "--nonce").as_deref() == Some("deterministic");
    let out_path = parse_flag(&args, "--out").unwrap_or_else(|| "proof.bin".to_string());

    let srs = match parse_flag(&args, "--srs") {
        Some(path) => {
            eprintln!("loading SRS from {}", path);
            Some(kzgdleq::srs::load_srs(&path)?)
        }
        None => None,
    };

    let nonce_choice = if deterministic {
        NonceChoice::Deterministic
    } else {
        NonceChoice::Random
    };

    let mut rng = rand::rngs::OsRng;
    eprintln!("proving p(x) = 0 at x = {}...", x_str);
    let proof = prove_with_secret(&poly, &x, &secret, srs.as_deref(), nonce_choice, &mut rng)
        .map_err(|e| anyhow::anyhow!("prover failed: {e}"))?;

    write_proof_file(Path::new(&out_path), &proof)?;
    eprintln!("✓ wrote {} (v{}, 394 bytes)", out_path, FILE_VERSION);
    eprintln!("   C = {}", hex::encode(proof.c.x_be_bytes()));
    eprintln!("   z = {}", hex::encode(proof.z.to_be_bytes()));

    eprintln!();
    eprintln!("To verify this proof, run:");
    eprintln!("  cargo run --bin verify -- --proof {}", out_path);

    Ok(())
}
