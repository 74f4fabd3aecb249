//! Gauss-Jordan inversion over GF(2^w) and GF(2)
//!
//! Both forms walk the pivot columns once: find a row with a non-zero entry
//! in the column (swapping it up if needed), scale it so the pivot is one,
//! then clear the column in every other row. The same row operations applied
//! to an identity matrix produce the inverse.

use crate::bitmatrix::BitMatrix;
use crate::error::{ErasureError, Result};
use crate::matrix::Matrix;
use log::trace;

fn require_square(rows: usize, cols: usize) -> Result<()> {
    if rows != cols {
        return Err(ErasureError::invalid(format!(
            "cannot invert a non-square {}x{} matrix",
            rows, cols
        )));
    }
    Ok(())
}

/// Reduce `a` to the identity, mirroring every row operation on `inv` when given
fn gauss_jordan(a: &mut Matrix, mut inv: Option<&mut Matrix>) -> Result<()> {
    let gf = a.field();
    let n = a.rows();

    for col in 0..n {
        if a.get(col, col) == 0 {
            let pivot = (col + 1..n)
                .find(|&r| a.get(r, col) != 0)
                .ok_or_else(|| {
                    trace!("no pivot in column {} of {}x{} matrix", col, n, n);
                    ErasureError::NotInvertible
                })?;
            a.swap_rows(col, pivot);
            if let Some(inv) = inv.as_deref_mut() {
                inv.swap_rows(col, pivot);
            }
        }

        let p = a.get(col, col);
        if p != 1 {
            let scale = gf.inverse(p)?;
            for v in a.row_mut(col) {
                *v = gf.multiply(*v, scale);
            }
            if let Some(inv) = inv.as_deref_mut() {
                for v in inv.row_mut(col) {
                    *v = gf.multiply(*v, scale);
                }
            }
        }

        let pivot_row = a.row(col).to_vec();
        let pivot_inv = inv.as_deref().map(|m| m.row(col).to_vec());
        for r in (0..n).filter(|&r| r != col) {
            let factor = a.get(r, col);
            if factor == 0 {
                continue;
            }
            for (v, &p) in a.row_mut(r).iter_mut().zip(&pivot_row) {
                *v ^= gf.multiply(factor, p);
            }
            if let (Some(inv), Some(pivot_inv)) = (inv.as_deref_mut(), pivot_inv.as_ref()) {
                for (v, &p) in inv.row_mut(r).iter_mut().zip(pivot_inv) {
                    *v ^= gf.multiply(factor, p);
                }
            }
        }
    }
    Ok(())
}

/// Inverse of a square matrix over its field
pub fn invert_matrix(matrix: &Matrix) -> Result<Matrix> {
    require_square(matrix.rows(), matrix.cols())?;
    let mut a = matrix.clone();
    let mut inv = Matrix::identity(matrix.rows(), matrix.w())?;
    gauss_jordan(&mut a, Some(&mut inv))?;
    Ok(inv)
}

pub fn is_invertible(matrix: &Matrix) -> bool {
    if !matrix.is_square() {
        return false;
    }
    let mut a = matrix.clone();
    gauss_jordan(&mut a, None).is_ok()
}

/// Bitmatrix rows packed 64 columns per word
struct PackedRows {
    words_per_row: usize,
    rows: Vec<Vec<u64>>,
}

impl PackedRows {
    fn from_bitmatrix(bm: &BitMatrix) -> Self {
        let words_per_row = bm.cols().div_ceil(64);
        let rows = (0..bm.rows())
            .map(|r| {
                let mut words = vec![0u64; words_per_row];
                for (c, &bit) in bm.row(r).iter().enumerate() {
                    if bit {
                        words[c / 64] |= 1 << (c % 64);
                    }
                }
                words
            })
            .collect();
        Self {
            words_per_row,
            rows,
        }
    }

    fn identity(n: usize) -> Self {
        let words_per_row = n.div_ceil(64);
        let rows = (0..n)
            .map(|r| {
                let mut words = vec![0u64; words_per_row];
                words[r / 64] = 1 << (r % 64);
                words
            })
            .collect();
        Self {
            words_per_row,
            rows,
        }
    }

    #[inline]
    fn bit(&self, row: usize, col: usize) -> bool {
        self.rows[row][col / 64] & (1 << (col % 64)) != 0
    }

    fn xor_row(&mut self, dst: usize, src: usize) {
        let src_row = self.rows[src].clone();
        for (d, s) in self.rows[dst].iter_mut().zip(&src_row) {
            *d ^= s;
        }
    }

    fn into_bitmatrix(self, n: usize, w: u32) -> Result<BitMatrix> {
        let mut bm = BitMatrix::zeroed(n, n, w)?;
        debug_assert_eq!(self.words_per_row, n.div_ceil(64));
        for (r, words) in self.rows.iter().enumerate() {
            for c in 0..n {
                bm.set(r, c, words[c / 64] & (1 << (c % 64)) != 0);
            }
        }
        Ok(bm)
    }
}

fn bit_gauss_jordan(a: &mut PackedRows, mut inv: Option<&mut PackedRows>) -> Result<()> {
    let n = a.rows.len();
    for col in 0..n {
        if !a.bit(col, col) {
            let pivot = (col + 1..n)
                .find(|&r| a.bit(r, col))
                .ok_or(ErasureError::NotInvertible)?;
            a.rows.swap(col, pivot);
            if let Some(inv) = inv.as_deref_mut() {
                inv.rows.swap(col, pivot);
            }
        }
        for r in 0..n {
            if r != col && a.bit(r, col) {
                a.xor_row(r, col);
                if let Some(inv) = inv.as_deref_mut() {
                    inv.xor_row(r, col);
                }
            }
        }
    }
    Ok(())
}

/// Inverse of a square bitmatrix over GF(2)
pub fn invert_bitmatrix(bm: &BitMatrix) -> Result<BitMatrix> {
    require_square(bm.rows(), bm.cols())?;
    let n = bm.rows();
    let mut a = PackedRows::from_bitmatrix(bm);
    let mut inv = PackedRows::identity(n);
    bit_gauss_jordan(&mut a, Some(&mut inv))?;
    inv.into_bitmatrix(n, bm.w())
}

pub fn is_invertible_bitmatrix(bm: &BitMatrix) -> bool {
    if !bm.is_square() {
        return false;
    }
    let mut a = PackedRows::from_bitmatrix(bm);
    bit_gauss_jordan(&mut a, None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmatrix::matrix_to_bitmatrix;

    #[test]
    fn test_identity_inverts_to_itself() {
        let id = Matrix::identity(4, 8).unwrap();
        assert_eq!(invert_matrix(&id).unwrap(), id);
    }

    #[test]
    fn test_inverse_times_matrix_is_identity() {
        let m = Matrix::from_vec(3, 3, 8, vec![1, 1, 1, 1, 2, 4, 1, 3, 5]).unwrap();
        let inv = invert_matrix(&m).unwrap();
        assert!(m.multiply(&inv).unwrap().is_identity());
        assert!(inv.multiply(&m).unwrap().is_identity());
        assert!(is_invertible(&m));
    }

    #[test]
    fn test_requires_row_swap() {
        let m = Matrix::from_vec(2, 2, 16, vec![0, 5, 7, 0]).unwrap();
        let inv = invert_matrix(&m).unwrap();
        assert!(m.multiply(&inv).unwrap().is_identity());
    }

    #[test]
    fn test_singular_matrix() {
        // Row 2 = row 0 + row 1
        let m = Matrix::from_vec(3, 3, 8, vec![1, 2, 3, 4, 5, 6, 5, 7, 5]).unwrap();
        assert_eq!(invert_matrix(&m), Err(ErasureError::NotInvertible));
        assert!(!is_invertible(&m));
    }

    #[test]
    fn test_non_square_is_invalid() {
        let m = Matrix::zeroed(2, 3, 8).unwrap();
        assert!(matches!(
            invert_matrix(&m),
            Err(ErasureError::InvalidArgument(_))
        ));
        assert!(!is_invertible(&m));
    }

    #[test]
    fn test_bitmatrix_inverse_matches_field_inverse() {
        let m = Matrix::from_vec(2, 2, 8, vec![1, 1, 1, 2]).unwrap();
        let inv = invert_matrix(&m).unwrap();

        let bm = matrix_to_bitmatrix(&m).unwrap();
        let bm_inv = invert_bitmatrix(&bm).unwrap();
        assert_eq!(bm_inv, matrix_to_bitmatrix(&inv).unwrap());
        assert!(is_invertible_bitmatrix(&bm));
    }

    #[test]
    fn test_singular_bitmatrix() {
        let bm = BitMatrix::from_bits(2, 2, 1, &[1, 1, 1, 1]).unwrap();
        assert_eq!(invert_bitmatrix(&bm), Err(ErasureError::NotInvertible));
        assert!(!is_invertible_bitmatrix(&bm));
    }

    #[test]
    fn test_wide_bitmatrix_crosses_word_boundary() {
        // 70x70 upper-triangular with ones on the diagonal and first row
        let n = 70;
        let mut bm = BitMatrix::identity(n, 1).unwrap();
        for c in 0..n {
            bm.set(0, c, true);
        }
        let inv = invert_bitmatrix(&bm).unwrap();
        // The inverse of I + e0*(1..1 without diagonal) is itself
        assert_eq!(inv, bm);
    }
}
