//! Lazily built lookup tables for GF(2^w)
//!
//! Every table is built at most once per width and shared read-only
//! afterwards. Construction goes through `OnceLock`, so two threads racing on
//! first use may both build a table but only one copy is ever published.

use super::{shift_multiply, PRIM_POLY};
use crate::error::{try_filled, ErasureError, Result};
use log::debug;
use std::sync::OnceLock;

/// Largest width for which log/antilog tables can be built
pub const MAX_LOG_TABLE_WIDTH: u32 = 29;

/// Largest width for which full multiplication/division tables can be built
pub const MAX_MULT_TABLE_WIDTH: u32 = 13;

/// Discrete log and antilog tables
///
/// `ilog` is stored twice over so that `log[a] + log[b]` and
/// `log[a] + (2^w - 1) - log[b]` index it without a modulo.
pub(crate) struct LogTables {
    nwm1: u32,
    log: Vec<u32>,
    ilog: Vec<u32>,
}

impl LogTables {
    fn build(w: u32) -> Result<Self> {
        debug!("building log tables for w={}", w);

        let nw = 1u64 << w;
        let nwm1 = (nw - 1) as u32;
        let prim = PRIM_POLY[w as usize] as u64;

        // log[v] == nwm1 marks "not yet visited"
        let mut log = try_filled(nw as usize, nwm1)?;
        let mut ilog = try_filled(2 * nwm1 as usize, 0u32)?;

        let mut b = 1u64;
        for j in 0..nwm1 {
            if log[b as usize] != nwm1 {
                return Err(ErasureError::invalid(format!(
                    "polynomial {:o} is not primitive for w={}",
                    prim, w
                )));
            }
            log[b as usize] = j;
            ilog[j as usize] = b as u32;

            b <<= 1;
            if b & nw != 0 {
                b = (b ^ prim) & (nw - 1);
            }
        }

        let (low, high) = ilog.split_at_mut(nwm1 as usize);
        high.copy_from_slice(low);

        Ok(Self { nwm1, log, ilog })
    }

    #[inline]
    pub fn log(&self, v: u32) -> u32 {
        self.log[v as usize]
    }

    #[inline]
    pub fn ilog(&self, exponent: u64) -> u32 {
        self.ilog[(exponent % self.nwm1 as u64) as usize]
    }

    #[inline]
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.ilog[(self.log[a as usize] + self.log[b as usize]) as usize]
    }

    /// `None` when dividing by zero
    #[inline]
    pub fn divide(&self, a: u32, b: u32) -> Option<u32> {
        if b == 0 {
            return None;
        }
        if a == 0 {
            return Some(0);
        }
        let idx = self.log[a as usize] as usize + self.nwm1 as usize - self.log[b as usize] as usize;
        Some(self.ilog[idx])
    }
}

/// Full multiplication and division tables, indexed by `(x << w) | y`
pub(crate) struct MultTables {
    w: u32,
    mult: Vec<u16>,
    div: Vec<u16>,
}

impl MultTables {
    fn build(w: u32) -> Result<Self> {
        let logs = log_tables(w)?;
        debug!("building multiplication tables for w={}", w);

        let nw = 1usize << w;
        let nwm1 = nw - 1;
        let mut mult = try_filled(nw * nw, 0u16)?;
        let mut div = try_filled(nw * nw, 0u16)?;

        for x in 1..nw {
            let logx = logs.log[x] as usize;
            let row = x << w;
            for y in 1..nw {
                let logy = logs.log[y] as usize;
                mult[row | y] = logs.ilog[logx + logy] as u16;
                div[row | y] = logs.ilog[logx + nwm1 - logy] as u16;
            }
        }

        Ok(Self { w, mult, div })
    }

    #[inline]
    pub fn multiply(&self, a: u32, b: u32) -> u32 {
        self.mult[((a << self.w) | b) as usize] as u32
    }

    /// `None` when dividing by zero
    #[inline]
    pub fn divide(&self, a: u32, b: u32) -> Option<u32> {
        if b == 0 {
            return None;
        }
        Some(self.div[((a << self.w) | b) as usize] as u32)
    }
}

/// Split-byte product tables for GF(2^32)
///
/// Table `s` holds `(p1 << 8i) * (p2 << 8j)` for every byte pair with
/// `i + j == s`, indexed by `(p1 << 8) | p2`. A 32-bit product is the XOR of
/// sixteen lookups, one per byte pair.
pub(crate) struct SplitW8Tables {
    tables: Vec<Vec<u32>>,
}

impl SplitW8Tables {
    fn build() -> Result<Self> {
        debug!("building split-w8 tables for w=32");

        let mut tables = Vec::with_capacity(7);
        for _ in 0..7 {
            tables.push(try_filled(1 << 16, 0u32)?);
        }

        // Byte positions (0, 0..4) cover sums 0..=3, (3, 1..4) cover 4..=6
        for i in [0u32, 3] {
            let ishift = i * 8;
            let first_j = if i == 0 { 0 } else { 1 };
            for j in first_j..4u32 {
                let jshift = j * 8;
                let table = &mut tables[(i + j) as usize];
                for p1 in 0..256u32 {
                    for p2 in 0..256u32 {
                        table[((p1 << 8) | p2) as usize] =
                            shift_multiply(p1 << ishift, p2 << jshift, 32);
                    }
                }
            }
        }

        Ok(Self { tables })
    }

    #[inline]
    pub fn multiply(&self, x: u32, y: u32) -> u32 {
        let mut acc = 0;
        for i in 0..4 {
            let a = ((x >> (i * 8)) & 0xFF) << 8;
            for j in 0..4 {
                let b = (y >> (j * 8)) & 0xFF;
                acc ^= self.tables[i + j][(a | b) as usize];
            }
        }
        acc
    }
}

static LOG_TABLES: [OnceLock<LogTables>; 33] = [const { OnceLock::new() }; 33];
static MULT_TABLES: [OnceLock<MultTables>; 33] = [const { OnceLock::new() }; 33];
static SPLIT_W8_TABLES: OnceLock<SplitW8Tables> = OnceLock::new();

/// Get (building on first use) the log tables for `w`
pub(crate) fn log_tables(w: u32) -> Result<&'static LogTables> {
    if w == 0 || w > MAX_LOG_TABLE_WIDTH {
        return Err(ErasureError::UnsupportedWidth(w));
    }
    let cell = &LOG_TABLES[w as usize];
    if let Some(tables) = cell.get() {
        return Ok(tables);
    }
    let built = LogTables::build(w)?;
    Ok(cell.get_or_init(|| built))
}

/// Get (building on first use) the full multiplication tables for `w`
pub(crate) fn mult_tables(w: u32) -> Result<&'static MultTables> {
    if w == 0 || w > MAX_MULT_TABLE_WIDTH {
        return Err(ErasureError::UnsupportedWidth(w));
    }
    let cell = &MULT_TABLES[w as usize];
    if let Some(tables) = cell.get() {
        return Ok(tables);
    }
    let built = MultTables::build(w)?;
    Ok(cell.get_or_init(|| built))
}

/// Get (building on first use) the GF(2^32) split tables
pub(crate) fn split_w8_tables() -> Result<&'static SplitW8Tables> {
    if let Some(tables) = SPLIT_W8_TABLES.get() {
        return Ok(tables);
    }
    let built = SplitW8Tables::build()?;
    Ok(SPLIT_W8_TABLES.get_or_init(|| built))
}
