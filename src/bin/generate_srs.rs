//! Trusted-setup SRS generation CLI (§4.2).
//!
//! Two modes:
//!   --secret <u64> --degree <N> --out <path>
//!     centralized SRS `[G, s·G, ..., s^N·G]`.
//!   --nodes <n> --degree <N> --secret <u64> --out-dir <dir>
//!     additively-shared SRS: writes `<dir>/node-<i>.srs` per node, never
//!     the reconstructed `s` itself.
//!
//! `--dev` (requires the `dev-srs` feature) uses a fixed, publicly-known
//! development secret instead of `--secret` — never use it in production.

#![forbid(unsafe_code)]

use std::{env, fs, path::PathBuf};

use kzgdleq::curve::Scalar;
use kzgdleq::srs;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_u64(s: &str) -> anyhow::Result<u64> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("expected an unsigned integer, got `{}`", s))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let degree = parse_u64(
        &parse_flag(&args, "--degree")
            .ok_or_else(|| anyhow::anyhow!("--degree <N> is required"))?,
    )? as usize;

    let dev = has_flag(&args, "--dev");

    #[cfg(feature = "dev-srs")]
    let secret = if dev {
        eprintln!("⚠️  using the public dev-srs secret; DO NOT use this setup in production");
        None
    } else {
        Some(parse_u64(
            &parse_flag(&args, "--secret")
                .ok_or_else(|| anyhow::anyhow!("--secret <u64> is required (or pass --dev)"))?,
        )?)
    };
    #[cfg(not(feature = "dev-srs"))]
    let secret = {
        if dev {
            anyhow::bail!("--dev requires building with the `dev-srs` feature");
        }
        Some(parse_u64(
            &parse_flag(&args, "--secret")
                .ok_or_else(|| anyhow::anyhow!("--secret <u64> is required"))?,
        )?)
    };

    if let Some(n_str) = parse_flag(&args, "--nodes") {
        let n = parse_u64(&n_str)? as usize;
        let out_dir = PathBuf::from(
            parse_flag(&args, "--out-dir")
                .ok_or_else(|| anyhow::anyhow!("--out-dir <dir> is required for shared SRS"))?,
        );
        fs::create_dir_all(&out_dir)?;

        let s = match secret {
            Some(v) => Scalar::from(v),
            None => anyhow::bail!("--dev is only supported for centralized SRS generation"),
        };
        let mut rng = rand::rngs::OsRng;
        eprintln!("generating {}-way shared SRS (degree {})...", n, degree);
        let shares = srs::generate_shared_srs(n, degree, &s, &mut rng)
            .map_err(|e| anyhow::anyhow!("SRS sharing failed: {e}"))?;

        for (i, share) in shares.iter().enumerate() {
            let path = out_dir.join(format!("node-{i}.share"));
            let mut out = Vec::with_capacity(share.len() * 32);
            for scalar in share {
                out.extend_from_slice(&scalar.to_be_bytes());
            }
            fs::write(&path, &out)?;
            eprintln!("✓ wrote {}", path.display());
        }
        eprintln!();
        eprintln!("Forget the secret scalar now. It was never written to disk.");
        return Ok(());
    }

    let out_path = parse_flag(&args, "--out").unwrap_or_else(|| "srs.bin".to_string());

    #[cfg(feature = "dev-srs")]
    let points = if dev {
        srs::generate_dev_srs(degree)
    } else {
        let s = Scalar::from(secret.unwrap());
        srs::generate_centralized_srs(&s, degree)
            .map_err(|e| anyhow::anyhow!("SRS generation failed: {e}"))?
    };
    #[cfg(not(feature = "dev-srs"))]
    let points = {
        let s = Scalar::from(secret.unwrap());
        srs::generate_centralized_srs(&s, degree)
            .map_err(|e| anyhow::anyhow!("SRS generation failed: {e}"))?
    };

    eprintln!("generating centralized SRS (degree {})...", degree);
    srs::save_srs(&out_path, &points)?;
    eprintln!("✓ wrote {} ({} points)", out_path, points.len());

    Ok(())
}
