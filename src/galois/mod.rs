//! Galois field GF(2^w) arithmetic for 1 <= w <= 32
//!
//! ## Multiplication strategies
//!
//! Each width has a default strategy, chosen by table size:
//!
//! - **w <= 10**: full multiplication/division tables (`2^2w` entries)
//! - **11 <= w <= 22**: log/antilog tables
//! - **23 <= w <= 31**: shift multiply, no tables at all
//! - **w == 32**: seven 64K-entry split-byte tables
//!
//! Tables are built lazily the first time a width needs them and are shared
//! read-only afterwards (see [`tables`]). The explicit per-strategy entry
//! points (`multtable_*`, `logtable_*`, `shift_*`, `split_w8_multiply`) are
//! available regardless of the default.
//!
//! Field elements are plain `u32` values in `[0, 2^w)`. Addition is XOR.

pub mod region;
mod tables;

pub use region::{region_xor, region_xor_into, WriteOp};
pub use tables::{MAX_LOG_TABLE_WIDTH, MAX_MULT_TABLE_WIDTH};

use crate::error::{ErasureError, Result};

/// Primitive polynomials indexed by w (x^w term included for w < 32)
pub const PRIM_POLY: [u32; 33] = [
    0,
    0o1,
    0o7,
    0o13,
    0o23,
    0o45,
    0o103,
    0o211,
    0o435,
    0o1021,
    0o2011,
    0o4005,
    0o10123,
    0o20033,
    0o42103,
    0o100003,
    0o210013,
    0o400011,
    0o1000201,
    0o2000047,
    0o4000011,
    0o10000005,
    0o20000003,
    0o40000041,
    0o100000207,
    0o200000011,
    0o400000107,
    0o1000000047,
    0o2000000011,
    0o4000000005,
    0o10040000007,
    0o20000000011,
    0o20000007,
];

/// How a field multiplies single elements by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultStrategy {
    Table,
    LogTable,
    Shift,
    SplitW8,
}

impl MultStrategy {
    pub fn for_width(w: u32) -> Self {
        match w {
            0..=10 => MultStrategy::Table,
            11..=22 => MultStrategy::LogTable,
            23..=31 => MultStrategy::Shift,
            _ => MultStrategy::SplitW8,
        }
    }
}

/// Handle to GF(2^w)
///
/// The handle is a validated width; the tables behind it are global and
/// shared between every handle of the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GaloisField {
    w: u32,
}

impl GaloisField {
    pub fn new(w: u32) -> Result<Self> {
        if !(1..=32).contains(&w) {
            return Err(ErasureError::UnsupportedWidth(w));
        }
        Ok(Self { w })
    }

    #[inline]
    pub fn w(&self) -> u32 {
        self.w
    }

    /// Number of elements, 2^w
    pub fn size(&self) -> u64 {
        1u64 << self.w
    }

    /// Largest element, 2^w - 1
    #[inline]
    pub fn max_element(&self) -> u32 {
        mask(self.w)
    }

    #[inline]
    pub fn contains(&self, v: u32) -> bool {
        v <= self.max_element()
    }

    pub fn primitive_polynomial(&self) -> u32 {
        PRIM_POLY[self.w as usize]
    }

    pub fn strategy(&self) -> MultStrategy {
        MultStrategy::for_width(self.w)
    }

    /// Build the tables the default strategy needs
    ///
    /// Calling this up front moves table construction (and any allocation
    /// failure) out of the first `multiply`.
    pub fn warm(&self) -> Result<()> {
        match self.strategy() {
            MultStrategy::Table => tables::mult_tables(self.w).map(|_| ()),
            MultStrategy::LogTable => tables::log_tables(self.w).map(|_| ()),
            MultStrategy::Shift => Ok(()),
            MultStrategy::SplitW8 => tables::split_w8_tables().map(|_| ()),
        }
    }

    /// Multiply two elements with the default strategy
    ///
    /// Inputs are reduced to w bits. If the strategy's tables cannot be
    /// allocated the product is computed by shift multiply instead.
    #[inline]
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        let (a, b) = (a & self.max_element(), b & self.max_element());
        if a == 0 || b == 0 {
            return 0;
        }
        match self.strategy() {
            MultStrategy::Table => match tables::mult_tables(self.w) {
                Ok(t) => t.multiply(a, b),
                Err(_) => shift_multiply(a, b, self.w),
            },
            MultStrategy::LogTable => match tables::log_tables(self.w) {
                Ok(t) => t.multiply(a, b),
                Err(_) => shift_multiply(a, b, self.w),
            },
            MultStrategy::Shift => shift_multiply(a, b, self.w),
            MultStrategy::SplitW8 => match tables::split_w8_tables() {
                Ok(t) => t.multiply(a, b),
                Err(_) => shift_multiply(a, b, self.w),
            },
        }
    }

    /// Divide `a` by `b` with the default strategy
    pub fn divide(&self, a: u32, b: u32) -> Result<u32> {
        let (a, b) = (a & self.max_element(), b & self.max_element());
        if b == 0 {
            return Err(ErasureError::DivisionByZero { w: self.w });
        }
        if a == 0 {
            return Ok(0);
        }
        let quotient = match self.strategy() {
            MultStrategy::Table => tables::mult_tables(self.w).ok().and_then(|t| t.divide(a, b)),
            MultStrategy::LogTable => tables::log_tables(self.w)
                .ok()
                .and_then(|t| t.divide(a, b)),
            MultStrategy::Shift | MultStrategy::SplitW8 => None,
        };
        match quotient {
            Some(q) => Ok(q),
            None => self.shift_divide(a, b),
        }
    }

    /// Multiplicative inverse; zero has none
    pub fn inverse(&self, a: u32) -> Result<u32> {
        match self.strategy() {
            MultStrategy::Shift | MultStrategy::SplitW8 => self.shift_inverse(a),
            _ => self.divide(1, a),
        }
    }

    /// `a` raised to `e`, with `a^0 == 1`
    pub fn pow(&self, a: u32, mut e: u64) -> u32 {
        let mut base = a & self.max_element();
        let mut acc = 1;
        while e > 0 {
            if e & 1 == 1 {
                acc = self.multiply(acc, base);
            }
            base = self.multiply(base, base);
            e >>= 1;
        }
        acc
    }

    /// Multiply by the generator: shift left and reduce
    #[inline]
    pub fn multiply_by_two(&self, a: u32) -> u32 {
        times_two(a & self.max_element(), self.w)
    }

    /// Discrete logarithm of a non-zero element (w < 30)
    pub fn log(&self, v: u32) -> Result<u32> {
        let t = tables::log_tables(self.w)?;
        if v == 0 || !self.contains(v) {
            return Err(ErasureError::invalid(format!(
                "log of {} is undefined in GF(2^{})",
                v, self.w
            )));
        }
        Ok(t.log(v))
    }

    /// Antilog: the generator raised to `exponent` (w < 30)
    pub fn ilog(&self, exponent: u64) -> Result<u32> {
        Ok(tables::log_tables(self.w)?.ilog(exponent))
    }

    pub fn multtable_multiply(&self, a: u32, b: u32) -> Result<u32> {
        self.check(a)?;
        self.check(b)?;
        Ok(tables::mult_tables(self.w)?.multiply(a, b))
    }

    pub fn multtable_divide(&self, a: u32, b: u32) -> Result<u32> {
        self.check(a)?;
        self.check(b)?;
        tables::mult_tables(self.w)?
            .divide(a, b)
            .ok_or(ErasureError::DivisionByZero { w: self.w })
    }

    pub fn logtable_multiply(&self, a: u32, b: u32) -> Result<u32> {
        self.check(a)?;
        self.check(b)?;
        Ok(tables::log_tables(self.w)?.multiply(a, b))
    }

    pub fn logtable_divide(&self, a: u32, b: u32) -> Result<u32> {
        self.check(a)?;
        self.check(b)?;
        tables::log_tables(self.w)?
            .divide(a, b)
            .ok_or(ErasureError::DivisionByZero { w: self.w })
    }

    /// Table-free multiply: XOR of `b * 2^i` for every set bit i of `a`
    pub fn shift_multiply(&self, a: u32, b: u32) -> u32 {
        shift_multiply(a & self.max_element(), b & self.max_element(), self.w)
    }

    /// Table-free inverse by inverting the w x w binary matrix of `a`
    pub fn shift_inverse(&self, a: u32) -> Result<u32> {
        shift_inverse(a & self.max_element(), self.w).ok_or(ErasureError::DivisionByZero { w: self.w })
    }

    pub fn shift_divide(&self, a: u32, b: u32) -> Result<u32> {
        let inv = self.shift_inverse(b)?;
        Ok(self.shift_multiply(a, inv))
    }

    /// Multiply through the GF(2^32) split-byte tables
    pub fn split_w8_multiply(&self, a: u32, b: u32) -> Result<u32> {
        if self.w != 32 {
            return Err(ErasureError::UnsupportedWidth(self.w));
        }
        Ok(tables::split_w8_tables()?.multiply(a, b))
    }

    fn check(&self, v: u32) -> Result<()> {
        if self.contains(v) {
            Ok(())
        } else {
            Err(ErasureError::invalid(format!(
                "{} is not an element of GF(2^{})",
                v, self.w
            )))
        }
    }
}

#[inline]
pub(crate) fn mask(w: u32) -> u32 {
    if w >= 32 {
        u32::MAX
    } else {
        (1u32 << w) - 1
    }
}

#[inline]
pub(crate) fn times_two(a: u32, w: u32) -> u32 {
    let shifted = (a as u64) << 1;
    if shifted & (1u64 << w) != 0 {
        ((shifted ^ PRIM_POLY[w as usize] as u64) & mask(w) as u64) as u32
    } else {
        shifted as u32
    }
}

pub(crate) fn shift_multiply(a: u32, b: u32, w: u32) -> u32 {
    let mut product = 0;
    let mut scratch = b;
    for i in 0..w {
        if a & (1 << i) != 0 {
            product ^= scratch;
        }
        scratch = times_two(scratch, w);
    }
    product
}

/// Row i of the multiplication matrix of `b` is `b * 2^i`; its inverse's
/// row 0 is the bit pattern of `1 / b`
fn shift_inverse(b: u32, w: u32) -> Option<u32> {
    let n = w as usize;
    let mut rows = [0u32; 32];
    let mut inv = [0u32; 32];

    let mut v = b;
    for i in 0..n {
        rows[i] = v;
        inv[i] = 1 << i;
        v = times_two(v, w);
    }

    for col in 0..n {
        let bit = 1u32 << col;
        if rows[col] & bit == 0 {
            let pivot = (col + 1..n).find(|&r| rows[r] & bit != 0)?;
            rows.swap(col, pivot);
            inv.swap(col, pivot);
        }
        for r in 0..n {
            if r != col && rows[r] & bit != 0 {
                rows[r] ^= rows[col];
                inv[r] ^= inv[col];
            }
        }
    }

    Some(inv[0])
}
