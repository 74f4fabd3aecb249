//! Dense matrices over GF(2^w)

use crate::error::{try_filled, ErasureError, Result};
use crate::galois::GaloisField;
use std::fmt;

/// Row-major matrix of field elements, tagged with its field
///
/// Every entry lies in `[0, 2^w)`. A coding matrix has `m` rows and `k`
/// columns: row i, column j is the coefficient of data device j in coding
/// device i.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    field: GaloisField,
    data: Vec<u32>,
}

fn element_count(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or(ErasureError::AllocationFailure { elements: usize::MAX })
}

impl Matrix {
    /// All-zero matrix
    pub fn zeroed(rows: usize, cols: usize, w: u32) -> Result<Self> {
        let field = GaloisField::new(w)?;
        let data = try_filled(element_count(rows, cols)?, 0)?;
        Ok(Self {
            rows,
            cols,
            field,
            data,
        })
    }

    /// Matrix from row-major values, validating shape and range
    pub fn from_vec(rows: usize, cols: usize, w: u32, data: Vec<u32>) -> Result<Self> {
        let field = GaloisField::new(w)?;
        if data.len() != element_count(rows, cols)? {
            return Err(ErasureError::invalid(format!(
                "{} values do not fill a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        if let Some(bad) = data.iter().find(|&&v| !field.contains(v)) {
            return Err(ErasureError::invalid(format!(
                "{} is not an element of GF(2^{})",
                bad, w
            )));
        }
        Ok(Self {
            rows,
            cols,
            field,
            data,
        })
    }

    pub fn identity(n: usize, w: u32) -> Result<Self> {
        let mut m = Self::zeroed(n, n, w)?;
        for i in 0..n {
            m.data[i * n + i] = 1;
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
        self.field.w()
    }

    #[inline]
    pub fn field(&self) -> GaloisField {
        self.field
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.cols + col]
    }

    /// Set one entry, rejecting positions outside the matrix and values
    /// outside the field
    pub fn try_set(&mut self, row: usize, col: usize, value: u32) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(ErasureError::invalid(format!(
                "({}, {}) is outside a {}x{} matrix",
                row, col, self.rows, self.cols
            )));
        }
        if !self.field.contains(value) {
            return Err(ErasureError::invalid(format!(
                "{} is not an element of GF(2^{})",
                value,
                self.w()
            )));
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    /// Unchecked setter for builders whose values are field results
    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: u32) {
        debug_assert!(self.field.contains(value));
        self.data[row * self.cols + col] = value & self.field.max_element();
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[u32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    #[inline]
    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u32] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.data
    }

    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
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
            field: self.field,
            data: self.data[start * self.cols..(start + count) * self.cols].to_vec(),
        })
    }

    /// Whether every entry of `row` is one
    pub fn row_is_ones(&self, row: usize) -> bool {
        self.row(row).iter().all(|&v| v == 1)
    }

    pub fn is_identity(&self) -> bool {
        self.is_square()
            && (0..self.rows).all(|r| {
                self.row(r)
                    .iter()
                    .enumerate()
                    .all(|(c, &v)| v == u32::from(r == c))
            })
    }

    /// Matrix product `self * other` over the shared field
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.w() != other.w() {
            return Err(ErasureError::invalid(format!(
                "cannot multiply GF(2^{}) by GF(2^{}) matrices",
                self.w(),
                other.w()
            )));
        }
        if self.cols != other.rows {
            return Err(ErasureError::invalid(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let gf = self.field;
        let mut out = Matrix::zeroed(self.rows, other.cols, self.w())?;
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = 0;
                for l in 0..self.cols {
                    acc ^= gf.multiply(self.get(i, l), other.get(l, j));
                }
                out.data[i * other.cols + j] = acc;
            }
        }
        Ok(out)
    }
}

/// Width of the widest element, in decimal digits
pub(crate) fn element_width(w: u32) -> usize {
    GaloisField::new(w)
        .map(|gf| gf.max_element().to_string().len())
        .unwrap_or(10)
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = element_width(self.w());
        for r in 0..self.rows {
            for (c, v) in self.row(r).iter().enumerate() {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>width$}", v, width = width)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
