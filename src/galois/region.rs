//! Bulk region operations over byte buffers
//!
//! A region is a byte slice read as little-endian words of w bits, for
//! w ∈ {8, 16, 32}. Multiplying a region by a constant uses small split
//! tables derived from the constant once per call:
//!
//! ```text
//! w = 8:  product = low[b & 0x0F] ^ high[b >> 4]             (2 x 16 entries)
//! w = 16: product = low[v & 0xFF] ^ high[v >> 8]             (2 x 256 entries)
//! w = 32: product = t0[v & 0xFF] ^ t1[..] ^ t2[..] ^ t3[v >> 24] (4 x 256 entries)
//! ```
//!
//! Multiplication by a constant is linear over GF(2), so each table is filled
//! from the images of single bits without touching the global field tables.

use super::{times_two, GaloisField};
use crate::error::{ErasureError, Result};

/// Specifies how to combine a product with the destination buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    /// Direct write: dest = multby * src (replaces contents)
    Direct,
    /// Accumulate: dest = dest XOR (multby * src)
    Add,
}

/// Per-constant split tables
enum SplitTables {
    W8 { low: [u8; 16], high: [u8; 16] },
    W16 { low: [u16; 256], high: [u16; 256] },
    W32 { parts: [[u32; 256]; 4] },
}

/// Fill `table[v]` with the product of `v << shift` for every `v` by XORing
/// bit images
fn fill_linear<const N: usize>(basis: &[u32], shift: usize) -> [u32; N] {
    let mut table = [0u32; N];
    for v in 1..N {
        let low_bit = v.trailing_zeros() as usize;
        table[v] = table[v & (v - 1)] ^ basis[shift + low_bit];
    }
    table
}

impl SplitTables {
    fn build(multby: u32, w: u32) -> Self {
        // basis[i] = multby * 2^i
        let mut basis = [0u32; 32];
        let mut v = multby;
        for slot in basis.iter_mut().take(w as usize) {
            *slot = v;
            v = times_two(v, w);
        }

        match w {
            8 => {
                let low = fill_linear::<16>(&basis, 0);
                let high = fill_linear::<16>(&basis, 4);
                SplitTables::W8 {
                    low: low.map(|x| x as u8),
                    high: high.map(|x| x as u8),
                }
            }
            16 => {
                let low = fill_linear::<256>(&basis, 0);
                let high = fill_linear::<256>(&basis, 8);
                SplitTables::W16 {
                    low: low.map(|x| x as u16),
                    high: high.map(|x| x as u16),
                }
            }
            _ => SplitTables::W32 {
                parts: [
                    fill_linear::<256>(&basis, 0),
                    fill_linear::<256>(&basis, 8),
                    fill_linear::<256>(&basis, 16),
                    fill_linear::<256>(&basis, 24),
                ],
            },
        }
    }

    fn apply(&self, src: &[u8], dest: &mut [u8], op: WriteOp) {
        match self {
            SplitTables::W8 { low, high } => {
                for (d, &s) in dest.iter_mut().zip(src) {
                    let p = low[(s & 0x0F) as usize] ^ high[(s >> 4) as usize];
                    match op {
                        WriteOp::Direct => *d = p,
                        WriteOp::Add => *d ^= p,
                    }
                }
            }
            SplitTables::W16 { low, high } => {
                for (d, s) in dest.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                    let word = u16::from_le_bytes([s[0], s[1]]);
                    let mut p = low[(word & 0xFF) as usize] ^ high[(word >> 8) as usize];
                    if op == WriteOp::Add {
                        p ^= u16::from_le_bytes([d[0], d[1]]);
                    }
                    d.copy_from_slice(&p.to_le_bytes());
                }
            }
            SplitTables::W32 { parts } => {
                for (d, s) in dest.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                    let mut p = parts[0][s[0] as usize]
                        ^ parts[1][s[1] as usize]
                        ^ parts[2][s[2] as usize]
                        ^ parts[3][s[3] as usize];
                    if op == WriteOp::Add {
                        p ^= u32::from_le_bytes([d[0], d[1], d[2], d[3]]);
                    }
                    d.copy_from_slice(&p.to_le_bytes());
                }
            }
        }
    }

    fn apply_in_place(&self, region: &mut [u8]) {
        match self {
            SplitTables::W8 { low, high } => {
                for b in region.iter_mut() {
                    *b = low[(*b & 0x0F) as usize] ^ high[(*b >> 4) as usize];
                }
            }
            SplitTables::W16 { low, high } => {
                for d in region.chunks_exact_mut(2) {
                    let word = u16::from_le_bytes([d[0], d[1]]);
                    let p = low[(word & 0xFF) as usize] ^ high[(word >> 8) as usize];
                    d.copy_from_slice(&p.to_le_bytes());
                }
            }
            SplitTables::W32 { parts } => {
                for d in region.chunks_exact_mut(4) {
                    let p = parts[0][d[0] as usize]
                        ^ parts[1][d[1] as usize]
                        ^ parts[2][d[2] as usize]
                        ^ parts[3][d[3] as usize];
                    d.copy_from_slice(&p.to_le_bytes());
                }
            }
        }
    }
}

impl GaloisField {
    /// Bytes per word for region operations, or an error for widths that
    /// have no region form
    pub fn region_word_bytes(&self) -> Result<usize> {
        match self.w() {
            8 => Ok(1),
            16 => Ok(2),
            32 => Ok(4),
            w => Err(ErasureError::UnsupportedWidth(w)),
        }
    }

    fn check_region(&self, multby: u32, len: usize) -> Result<()> {
        let word = self.region_word_bytes()?;
        if !self.contains(multby) {
            return Err(ErasureError::invalid(format!(
                "multiplier {} is not an element of GF(2^{})",
                multby,
                self.w()
            )));
        }
        if len % word != 0 {
            return Err(ErasureError::invalid(format!(
                "region length {} is not a multiple of {} bytes",
                len, word
            )));
        }
        Ok(())
    }

    /// Multiply every word of `src` by `multby` into `dest`
    pub fn region_multiply(
        &self,
        src: &[u8],
        multby: u32,
        dest: &mut [u8],
        op: WriteOp,
    ) -> Result<()> {
        if src.len() != dest.len() {
            return Err(ErasureError::invalid(format!(
                "region lengths differ: {} vs {}",
                src.len(),
                dest.len()
            )));
        }
        self.check_region(multby, src.len())?;

        match (multby, op) {
            (0, WriteOp::Direct) => dest.fill(0),
            (0, WriteOp::Add) => {}
            (1, WriteOp::Direct) => dest.copy_from_slice(src),
            (1, WriteOp::Add) => xor_into(src, dest),
            _ => SplitTables::build(multby, self.w()).apply(src, dest, op),
        }
        Ok(())
    }

    /// Multiply every word of `region` by `multby` in place
    pub fn region_multiply_in_place(&self, region: &mut [u8], multby: u32) -> Result<()> {
        self.check_region(multby, region.len())?;
        match multby {
            0 => region.fill(0),
            1 => {}
            _ => SplitTables::build(multby, self.w()).apply_in_place(region),
        }
        Ok(())
    }
}

fn xor_into(src: &[u8], dest: &mut [u8]) {
    for (d, s) in dest.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// `dest = src1 XOR src2`
pub fn region_xor(src1: &[u8], src2: &[u8], dest: &mut [u8]) -> Result<()> {
    if src1.len() != src2.len() || src1.len() != dest.len() {
        return Err(ErasureError::invalid(format!(
            "region lengths differ: {}, {}, {}",
            src1.len(),
            src2.len(),
            dest.len()
        )));
    }
    for ((d, a), b) in dest.iter_mut().zip(src1).zip(src2) {
        *d = a ^ b;
    }
    Ok(())
}

/// `dest ^= src`
pub fn region_xor_into(src: &[u8], dest: &mut [u8]) -> Result<()> {
    if src.len() != dest.len() {
        return Err(ErasureError::invalid(format!(
            "region lengths differ: {} vs {}",
            src.len(),
            dest.len()
        )));
    }
    xor_into(src, dest);
    Ok(())
}
