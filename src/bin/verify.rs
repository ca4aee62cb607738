//! Verifier CLI for proof files written by `prove` (§4.5).
//!
//! Reads the `KZGDLEQ\0` v1 proof file, re-derives the challenge, and
//! checks `A1 = zG - eW` / `A2 = zT - eC`. Exits non-zero on rejection.

#![forbid(unsafe_code)]

use std::{env, fs, path::Path};

use kzgdleq::curve::{Point, Scalar};
use kzgdleq::kzg::{verify, DleqProof};

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

fn read_proof_file(path: &Path) -> anyhow::Result<DleqProof> {
    let data = fs::read(path)?;
    if data.len() != 8 + 2 + 5 * 64 + 2 * 32 {
        anyhow::bail!(
            "bad proof file length: expected {} bytes, got {}",
            8 + 2 + 5 * 64 + 2 * 32,
            data.len()
        );
    }
    if &data[0..8] != FILE_MAGIC {
        anyhow::bail!("bad magic: not a KZGDLEQ proof file");
    }
    let version = u16::from_be_bytes([data[8], data[9]]);
    if version != FILE_VERSION {
        anyhow::bail!("unsupported proof file version {}", version);
    }

    let mut off = 10;
    let mut next_point = || -> anyhow::Result<Point> {
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&data[off..off + 32]);
        y.copy_from_slice(&data[off + 32..off + 64]);
        off += 64;
        Ok(Point::from_be_bytes(&x, &y)?)
    };

    let c = next_point()?;
    let w = next_point()?;
    let p = next_point()?;
    let a1 = next_point()?;
    let a2 = next_point()?;

    let mut x_bytes = [0u8; 32];
    x_bytes.copy_from_slice(&data[off..off + 32]);
    off += 32;
    let mut z_bytes = [0u8; 32];
    z_bytes.copy_from_slice(&data[off..off + 32]);

    let x = Scalar::from_be_bytes_strict(&x_bytes)?;
    let z = Scalar::from_be_bytes_strict(&z_bytes)?;

    Ok(DleqProof { c, w, p, a1, a2, x, z })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let proof_path = parse_flag(&args, "--proof").unwrap_or_else(|| "proof.bin".to_string());

    eprintln!("reading {}...", proof_path);
    let proof = read_proof_file(Path::new(&proof_path))?;

    eprintln!("   C = {}", hex::encode(proof.c.x_be_bytes()));
    match verify(&proof) {
        Ok(()) => {
            println!("✓ proof verifies");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ proof rejected: {}", e);
            std::process::exit(1);
        }
    }
}
