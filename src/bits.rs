//! Packed bit vectors and matrices.
//!
//! `BitVector`/`BitMatrix` back the IKNP extension and ROLE bit-decomposition
//! machinery. Storage is row-major, byte-packed (byte `j` bit `i mod 8`
//! stores logical bit `i`), following the same newtype-plus-bounds-check
//! idiom as the teacher's block/row indices.

use crate::curve::hkdf_keccak_expand;
use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use thiserror::Error;

/// Errors from bit-container construction and indexing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitsError {
    /// Two buffers that should have matched lengths did not.
    #[error("length mismatch: {a} vs {b}")]
    LengthMismatch {
        /// Length of the first buffer.
        a: usize,
        /// Length of the second buffer.
        b: usize,
    },
    /// An index fell outside the container's bounds.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds {
        /// The offending index.
        index: usize,
        /// The container's length.
        len: usize,
    },
    /// `scalarFromBits` was asked for a bit length wide enough that
    /// `2^bitLength >= N`, breaking injectivity into the scalar field.
    #[error("bit length {bit_length} is not injective into the scalar field")]
    NotInjective {
        /// The requested bit length.
        bit_length: usize,
    },
}

/// A dense, byte-packed bit vector of logical length `len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    len: usize,
    bytes: Vec<u8>,
}

impl BitVector {
    /// Builds a zero-filled vector of `len` bits.
    pub fn zeros(len: usize) -> Self {
        BitVector {
            len,
            bytes: vec![0u8; (len + 7) / 8],
        }
    }

    /// Wraps an explicit backing buffer, which must have exactly
    /// `ceil(len/8)` bytes.
    pub fn from_bytes(len: usize, bytes: Vec<u8>) -> Result<Self, BitsError> {
        let expected = (len + 7) / 8;
        if bytes.len() != expected {
            return Err(BitsError::LengthMismatch {
                a: expected,
                b: bytes.len(),
            });
        }
        Ok(BitVector { len, bytes })
    }

    /// Samples `len` uniformly random bits from a CSPRNG.
    pub fn random(len: usize, rng: &mut impl RngCore) -> Self {
        let mut bytes = vec![0u8; (len + 7) / 8];
        rng.fill_bytes(&mut bytes);
        BitVector { len, bytes }
    }

    /// Logical bit length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if there are no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing byte buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reads logical bit `i`.
    pub fn get(&self, i: usize) -> Result<bool, BitsError> {
        if i >= self.len {
            return Err(BitsError::OutOfBounds { index: i, len: self.len });
        }
        Ok((self.bytes[i / 8] >> (i % 8)) & 1 == 1)
    }

    /// Sets logical bit `i`.
    pub fn set(&mut self, i: usize, value: bool) -> Result<(), BitsError> {
        if i >= self.len {
            return Err(BitsError::OutOfBounds { index: i, len: self.len });
        }
        let byte = &mut self.bytes[i / 8];
        let mask = 1u8 << (i % 8);
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        Ok(())
    }

    /// XOR of two equal-length bit vectors.
    pub fn xor(&self, other: &BitVector) -> Result<BitVector, BitsError> {
        if self.len != other.len {
            return Err(BitsError::LengthMismatch {
                a: self.len,
                b: other.len,
            });
        }
        let bytes = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        Ok(BitVector { len: self.len, bytes })
    }
}

/// Little-endian bit decomposition: `x = Σ_j bit[offset+j]·2^j (mod N)`,
/// truncating at the end of the vector. Requires `2^bit_length < N` so the
/// map from bit strings to scalars is injective (§4.2).
pub fn scalar_from_bits(
    bits: &BitVector,
    offset: usize,
    bit_length: usize,
) -> Result<crate::curve::Scalar, BitsError> {
    let n = crate::curve::group_order();
    let two_pow = BigUint::from(1u8) << bit_length;
    if two_pow >= n {
        return Err(BitsError::NotInjective { bit_length });
    }
    let mut acc = BigUint::zero();
    for j in 0..bit_length {
        let idx = offset + j;
        if idx >= bits.len() {
            break;
        }
        if bits.get(idx).map_err(|_| BitsError::OutOfBounds { index: idx, len: bits.len() })? {
            acc += BigUint::from(1u8) << j;
        }
    }
    Ok(crate::curve::Scalar::from_biguint_mod(acc))
}

/// A row-major, byte-packed `r x c` bit matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    data: Vec<BitVector>,
}

impl BitMatrix {
    /// Builds a zero-filled `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        BitMatrix {
            rows,
            cols,
            data: (0..rows).map(|_| BitVector::zeros(cols)).collect(),
        }
    }

    /// Samples a uniformly random matrix from a CSPRNG (`seed` is `None`),
    /// or a deterministic matrix derived from a 32-byte seed via
    /// `HKDF(Keccak-256)` with `info = uint32(r) || uint32(c)` (§3).
    pub fn random(rows: usize, cols: usize, seed: Option<&[u8; 32]>, rng: &mut impl RngCore) -> Self {
        match seed {
            None => BitMatrix {
                rows,
                cols,
                data: (0..rows).map(|_| BitVector::random(cols, rng)).collect(),
            },
            Some(seed) => {
                let mut info = Vec::with_capacity(8);
                info.extend_from_slice(&(rows as u32).to_be_bytes());
                info.extend_from_slice(&(cols as u32).to_be_bytes());
                let row_bytes = (cols + 7) / 8;
                let total = row_bytes * rows;
                let okm = hkdf_keccak_expand(seed, &[], &info, total);
                let data = okm
                    .chunks(row_bytes)
                    .map(|chunk| BitVector::from_bytes(cols, chunk.to_vec()).expect("exact row length"))
                    .collect();
                BitMatrix { rows, cols, data }
            }
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Borrows row `i`.
    pub fn row(&self, i: usize) -> Result<&BitVector, BitsError> {
        self.data
            .get(i)
            .ok_or(BitsError::OutOfBounds { index: i, len: self.rows })
    }

    /// Extracts column `j` as a fresh bit vector of length `rows`.
    pub fn column(&self, j: usize) -> Result<BitVector, BitsError> {
        if j >= self.cols {
            return Err(BitsError::OutOfBounds { index: j, len: self.cols });
        }
        let mut out = BitVector::zeros(self.rows);
        for i in 0..self.rows {
            let bit = self.data[i].get(j)?;
            out.set(i, bit)?;
        }
        Ok(out)
    }

    /// Sets row `i` from an equal-length bit vector.
    pub fn set_row(&mut self, i: usize, row: BitVector) -> Result<(), BitsError> {
        if i >= self.rows {
            return Err(BitsError::OutOfBounds { index: i, len: self.rows });
        }
        if row.len() != self.cols {
            return Err(BitsError::LengthMismatch {
                a: self.cols,
                b: row.len(),
            });
        }
        self.data[i] = row;
        Ok(())
    }

    /// Overwrites column `j` from an equal-length (`rows`) bit vector.
    pub fn set_column(&mut self, j: usize, col: &BitVector) -> Result<(), BitsError> {
        if j >= self.cols {
            return Err(BitsError::OutOfBounds { index: j, len: self.cols });
        }
        if col.len() != self.rows {
            return Err(BitsError::LengthMismatch {
                a: self.rows,
                b: col.len(),
            });
        }
        for i in 0..self.rows {
            let bit = col.get(i)?;
            self.data[i].set(j, bit)?;
        }
        Ok(())
    }

    /// Produces `T' = T ⊕ r`, the derived matrix the IKNP receiver sends
    /// alongside `T` (§4.9): `mask` has length `rows` and column `j` of the
    /// output equals column `j` of `self` XORed with `mask`, for every `j`.
    /// Equivalently, row `i` is flipped in full when `mask` bit `i` is set.
    pub fn xor_columns(&self, mask: &BitVector) -> Result<BitMatrix, BitsError> {
        if mask.len() != self.rows {
            return Err(BitsError::LengthMismatch {
                a: self.rows,
                b: mask.len(),
            });
        }
        let mut all_ones = BitVector::zeros(self.cols);
        for c in 0..self.cols {
            all_ones.set(c, true)?;
        }
        let mut out = BitMatrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            let row = self.row(i)?;
            let masked = if mask.get(i)? { row.xor(&all_ones)? } else { row.clone() };
            out.set_row(i, masked)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn set_get_round_trips() {
        let mut v = BitVector::zeros(10);
        v.set(3, true).unwrap();
        assert!(v.get(3).unwrap());
        assert!(!v.get(4).unwrap());
    }

    #[test]
    fn xor_is_self_inverse() {
        let mut rng = OsRng;
        let a = BitVector::random(64, &mut rng);
        let b = BitVector::random(64, &mut rng);
        let c = a.xor(&b).unwrap();
        let back = c.xor(&b).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn xor_columns_flips_rows_selected_by_mask() {
        let mut m = BitMatrix::zeros(3, 4);
        m.set_row(0, {
            let mut r = BitVector::zeros(4);
            r.set(1, true).unwrap();
            r
        })
        .unwrap();
        let mut mask = BitVector::zeros(3);
        mask.set(0, true).unwrap();
        let out = m.xor_columns(&mask).unwrap();
        // Row 0 had bit 1 set and mask[0]=true, so every bit flips: 0b1101.
        assert!(out.row(0).unwrap().get(0).unwrap());
        assert!(!out.row(0).unwrap().get(1).unwrap());
        assert!(out.row(0).unwrap().get(2).unwrap());
        assert!(out.row(0).unwrap().get(3).unwrap());
        // Row 1 was all-zero and mask[1]=false, so it is unchanged.
        assert!(!out.row(1).unwrap().get(0).unwrap());
    }

    #[test]
    fn deterministic_matrix_seed_is_stable() {
        let seed = [7u8; 32];
        let mut rng = OsRng;
        let m1 = BitMatrix::random(4, 16, Some(&seed), &mut rng);
        let m2 = BitMatrix::random(4, 16, Some(&seed), &mut rng);
        assert_eq!(m1, m2);
    }

    #[test]
    fn column_extraction_matches_rows() {
        let mut m = BitMatrix::zeros(3, 3);
        m.set_row(0, {
            let mut r = BitVector::zeros(3);
            r.set(1, true).unwrap();
            r
        })
        .unwrap();
        let col1 = m.column(1).unwrap();
        assert!(col1.get(0).unwrap());
        assert!(!col1.get(1).unwrap());
    }

    #[test]
    fn scalar_from_bits_matches_manual_sum() {
        let mut v = BitVector::zeros(8);
        v.set(0, true).unwrap();
        v.set(2, true).unwrap();
        let s = scalar_from_bits(&v, 0, 8).unwrap();
        assert_eq!(s, crate::curve::Scalar::from(5u64));
    }
}
