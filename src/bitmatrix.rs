//! Binary matrices and the GF(2^w) to GF(2) expansion
//!
//! Multiplying by a constant `e` is linear over GF(2), so it can be written
//! as a w x w bit matrix. Column x of that block holds the bits of `e * 2^x`
//! and row l holds bit l. Expanding every entry of an m x k coding matrix
//! this way gives an (m*w) x (k*w) bitmatrix that encodes with XOR alone.

use crate::error::{try_filled, ErasureError, Result};
use crate::galois::GaloisField;
use crate::matrix::Matrix;
use log::debug;
use std::fmt;

/// Row-major binary matrix tagged with the w it was built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    w: u32,
    bits: Vec<bool>,
}

impl BitMatrix {
    pub fn zeroed(rows: usize, cols: usize, w: u32) -> Result<Self> {
        GaloisField::new(w)?;
        let len = rows
            .checked_mul(cols)
            .ok_or(ErasureError::AllocationFailure { elements: usize::MAX })?;
        Ok(Self {
            rows,
            cols,
            w,
            bits: try_filled(len, false)?,
        })
    }

    /// Bitmatrix from row-major 0/1 values
    pub fn from_bits(rows: usize, cols: usize, w: u32, bits: &[u8]) -> Result<Self> {
        let mut m = Self::zeroed(rows, cols, w)?;
        if bits.len() != m.bits.len() {
            return Err(ErasureError::invalid(format!(
                "{} bits do not fill a {}x{} bitmatrix",
                bits.len(),
                rows,
                cols
            )));
        }
        for (dst, &b) in m.bits.iter_mut().zip(bits) {
            *dst = match b {
                0 => false,
                1 => true,
                other => {
                    return Err(ErasureError::invalid(format!(
                        "bitmatrix entry {} is not 0 or 1",
                        other
                    )))
                }
            };
        }
        Ok(m)
    }

    pub fn identity(n: usize, w: u32) -> Result<Self> {
        let mut m = Self::zeroed(n, n, w)?;
        for i in 0..n {
            m.set(i, i, true);
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.bits[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, bit: bool) {
        self.bits[row * self.cols + col] = bit;
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[bool] {
        &self.bits[row * self.cols..(row + 1) * self.cols]
    }

    /// Total number of set bits
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Copy of `count` consecutive rows starting at `start`
    pub fn sub_rows(&self, start: usize, count: usize) -> Result<Self> {
        if start + count > self.rows {
            return Err(ErasureError::invalid(format!(
                "rows {}..{} out of range for {} rows",
                start,
                start + count,
                self.rows
            )));
        }
        Ok(Self {
            rows: count,
            cols: self.cols,
            w: self.w,
            bits: self.bits[start * self.cols..(start + count) * self.cols].to_vec(),
        })
    }

    /// Whether every w x w block in block-row `block_row` is the identity
    pub fn block_row_is_identity(&self, block_row: usize) -> bool {
        let w = self.w as usize;
        (0..w).all(|l| {
            let r = block_row * w + l;
            (0..self.cols).all(|c| self.get(r, c) == (c % w == l))
        })
    }
}

impl fmt::Display for BitMatrix {
    /// Rows of 0/1 digits, a space between w-column blocks and a blank line
    /// between w-row blocks
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = (self.w as usize).max(1);
        for r in 0..self.rows {
            if r > 0 && r % w == 0 {
                writeln!(f)?;
            }
            for (c, &b) in self.row(r).iter().enumerate() {
                if c > 0 && c % w == 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", u8::from(b))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Expand an m x k field matrix into its (m*w) x (k*w) bitmatrix
pub fn matrix_to_bitmatrix(matrix: &Matrix) -> Result<BitMatrix> {
    let gf = matrix.field();
    let w = gf.w() as usize;
    let rows = matrix
        .rows()
        .checked_mul(w)
        .ok_or(ErasureError::AllocationFailure { elements: usize::MAX })?;
    let cols = matrix
        .cols()
        .checked_mul(w)
        .ok_or(ErasureError::AllocationFailure { elements: usize::MAX })?;

    debug!(
        "expanding {}x{} matrix over GF(2^{}) to {}x{} bitmatrix",
        matrix.rows(),
        matrix.cols(),
        w,
        rows,
        cols
    );

    let mut bm = BitMatrix::zeroed(rows, cols, gf.w())?;
    for i in 0..matrix.rows() {
        for j in 0..matrix.cols() {
            let mut elt = matrix.get(i, j);
            for x in 0..w {
                for l in 0..w {
                    bm.set(i * w + l, j * w + x, elt & (1 << l) != 0);
                }
                elt = gf.multiply_by_two(elt);
            }
        }
    }
    Ok(bm)
}
