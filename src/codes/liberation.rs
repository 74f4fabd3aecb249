//! XOR-only RAID-6 bitmatrix codes: Liberation, Liber8tion and Blaum-Roth
//!
//! Each builder returns a `2w x kw` bitmatrix. The top w rows are identity
//! blocks (P parity); the bottom w rows hold one sparse w x w block per data
//! device (Q parity).

use crate::bitmatrix::BitMatrix;
use crate::error::{ErasureError, Result};
use log::{debug, warn};

fn is_prime(n: u32) -> bool {
    n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

fn check_k(k: usize, w: u32) -> Result<()> {
    if k == 0 {
        return Err(ErasureError::invalid("k must be positive"));
    }
    if k > w as usize {
        return Err(ErasureError::invalid(format!(
            "k = {} exceeds w = {}",
            k, w
        )));
    }
    Ok(())
}

/// P rows: identity block for every data device
fn with_parity_rows(k: usize, w: u32) -> Result<BitMatrix> {
    let wu = w as usize;
    let mut bm = BitMatrix::zeroed(2 * wu, k * wu, w)?;
    for i in 0..wu {
        for j in 0..k {
            bm.set(i, j * wu + i, true);
        }
    }
    Ok(bm)
}

/// Liberation code bitmatrix
///
/// Q block j is the identity rotated by j, plus (for j > 0) one extra bit.
/// The code is MDS when w is prime; other widths still recover any single
/// erasure.
pub fn liberation_coding_bitmatrix(k: usize, w: u32) -> Result<BitMatrix> {
    check_k(k, w)?;
    if !is_prime(w) {
        warn!("liberation code with non-prime w={} is not MDS", w);
    }
    let wu = w as usize;
    let mut bm = with_parity_rows(k, w)?;

    for j in 0..k {
        for i in 0..wu {
            bm.set(wu + i, j * wu + (j + i) % wu, true);
        }
        if j > 0 {
            let i = (j * ((wu - 1) / 2)) % wu;
            bm.set(wu + i, j * wu + (i + j - 1) % wu, true);
        }
    }

    debug!("built liberation bitmatrix k={} w={}", k, w);
    Ok(bm)
}

/// Liber8tion Q blocks, one per data device. Entry `[j][r]` is the column
/// mask of row r in block j (bit c set means column c). Block 0 is the
/// identity; every later block is a permutation plus one extra bit, and
/// every pairwise XOR of blocks is invertible.
const LIBER8TION_Q_BLOCKS: [[u8; 8]; 8] = [
    [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80],
    [0x80, 0x01, 0x08, 0x40, 0x24, 0x02, 0x20, 0x10],
    [0x20, 0x40, 0x02, 0x10, 0x04, 0x80, 0x01, 0x0c],
    [0x40, 0x90, 0x10, 0x20, 0x08, 0x01, 0x02, 0x04],
    [0x04, 0x80, 0x40, 0x82, 0x01, 0x10, 0x08, 0x20],
    [0x02, 0x10, 0x80, 0x01, 0x20, 0x48, 0x04, 0x08],
    [0x08, 0x20, 0x50, 0x04, 0x02, 0x40, 0x80, 0x01],
    [0x10, 0x04, 0x01, 0x02, 0x80, 0x08, 0x22, 0x40],
];

/// Liber8tion bitmatrix (w = 8, k <= 8)
///
/// Minimum density: the Q block row carries 8k + k - 1 ones. Built from a
/// fixed table without any field arithmetic.
pub fn liber8tion_coding_bitmatrix(k: usize) -> Result<BitMatrix> {
    check_k(k, 8)?;
    let mut bm = with_parity_rows(k, 8)?;

    for (j, block) in LIBER8TION_Q_BLOCKS.iter().take(k).enumerate() {
        for (r, &mask) in block.iter().enumerate() {
            for c in (0..8usize).filter(|&c| mask & (1 << c) != 0) {
                bm.set(8 + r, j * 8 + c, true);
            }
        }
    }

    debug!("built liber8tion bitmatrix k={}", k);
    Ok(bm)
}

/// Blaum-Roth bitmatrix over the ring modulo `1 + x + ... + x^w`
///
/// Requires k <= w and w + 1 prime.
pub fn blaum_roth_coding_bitmatrix(k: usize, w: u32) -> Result<BitMatrix> {
    check_k(k, w)?;
    if !is_prime(w + 1) {
        return Err(ErasureError::invalid(format!(
            "blaum-roth needs w + 1 prime, got w = {}",
            w
        )));
    }
    let wu = w as usize;
    let p = wu + 1;
    let mut bm = with_parity_rows(k, w)?;

    for l in 0..wu {
        bm.set(wu + l, l, true);
    }

    for j in 1..k {
        let base = j * wu;
        for l in 1..=wu {
            let row = wu + l - 1;
            if l != p - j {
                let col = (l + j) % p - 1;
                bm.set(row, base + col, true);
            } else {
                bm.set(row, base + j - 1, true);
                let half = if j % 2 == 0 { j / 2 } else { p / 2 + 1 + j / 2 };
                bm.set(row, base + half - 1, true);
            }
        }
    }

    debug!("built blaum-roth bitmatrix k={} w={}", k, w);
    Ok(bm)
}
