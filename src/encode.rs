//! Dot products and encoding
//!
//! ## Matrix path
//!
//! Coding device i is the GF(2^w) dot product of matrix row i with the data
//! devices. Coefficients of one are applied as plain copies/XORs, every other
//! non-zero coefficient goes through [`GaloisField::region_multiply`] (the
//! first term writes directly, later terms accumulate).
//!
//! ## Bitmatrix path
//!
//! Buffers are cut into stripes of `w * packetsize` bytes, each stripe holding
//! w packets. Output packet l of a stripe is the XOR of every source packet
//! whose bit is set in bitmatrix row l. No field arithmetic is involved.

use crate::bitmatrix::BitMatrix;
use crate::error::{ErasureError, Result};
use crate::galois::{GaloisField, WriteOp};
use crate::matrix::Matrix;
use crate::stats;
use rayon::prelude::*;

fn xor_into(src: &[u8], dest: &mut [u8]) {
    for (d, s) in dest.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// `dest = sum(row[j] * sources[j])` over GF(2^w), w ∈ {8, 16, 32}
pub fn matrix_dotprod(
    gf: GaloisField,
    row: &[u32],
    sources: &[&[u8]],
    dest: &mut [u8],
) -> Result<()> {
    if row.len() != sources.len() {
        return Err(ErasureError::invalid(format!(
            "{} coefficients for {} sources",
            row.len(),
            sources.len()
        )));
    }
    let word = gf.region_word_bytes()?;
    let size = dest.len();
    if size % word != 0 {
        return Err(ErasureError::invalid(format!(
            "buffer length {} is not a multiple of {} bytes",
            size, word
        )));
    }
    if sources.iter().any(|s| s.len() != size) {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }

    let mut initialized = false;

    for (_, src) in row.iter().zip(sources).filter(|(c, _)| **c == 1) {
        if initialized {
            xor_into(src, dest);
            stats::record_xor(size);
        } else {
            dest.copy_from_slice(src);
            stats::record_copy(size);
            initialized = true;
        }
    }

    for (&c, src) in row.iter().zip(sources).filter(|(c, _)| **c > 1) {
        let op = if initialized {
            WriteOp::Add
        } else {
            WriteOp::Direct
        };
        gf.region_multiply(src, c, dest, op)?;
        stats::record_gf(size);
        initialized = true;
    }

    if !initialized {
        dest.fill(0);
    }
    Ok(())
}

/// XOR dot product of bitmatrix block row `block_row` with `sources`
///
/// `bitmatrix` must have `sources.len() * w` columns, and every buffer
/// length must be a multiple of `w * packetsize`.
pub fn bitmatrix_dotprod(
    bitmatrix: &BitMatrix,
    block_row: usize,
    sources: &[&[u8]],
    dest: &mut [u8],
    packetsize: usize,
) -> Result<()> {
    let w = bitmatrix.w() as usize;
    if bitmatrix.cols() != sources.len() * w {
        return Err(ErasureError::invalid(format!(
            "bitmatrix has {} columns but {} sources of w={}",
            bitmatrix.cols(),
            sources.len(),
            w
        )));
    }
    if (block_row + 1) * w > bitmatrix.rows() {
        return Err(ErasureError::invalid(format!(
            "block row {} out of range",
            block_row
        )));
    }
    let size = dest.len();
    check_stripes(size, w, packetsize)?;
    if sources.iter().any(|s| s.len() != size) {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }

    let stripe = w * packetsize;
    let (mut xored, mut copied) = (0, 0);
    for base in (0..size).step_by(stripe) {
        for l in 0..w {
            let bits = bitmatrix.row(block_row * w + l);
            let out = &mut dest[base + l * packetsize..base + (l + 1) * packetsize];
            let mut initialized = false;

            for (col, _) in bits.iter().enumerate().filter(|(_, b)| **b) {
                let (j, x) = (col / w, col % w);
                let start = base + x * packetsize;
                let packet = &sources[j][start..start + packetsize];
                if initialized {
                    xor_into(packet, out);
                    xored += packetsize;
                } else {
                    out.copy_from_slice(packet);
                    copied += packetsize;
                    initialized = true;
                }
            }

            if !initialized {
                out.fill(0);
            }
        }
    }
    stats::record_xor(xored);
    stats::record_copy(copied);
    Ok(())
}

pub(crate) fn check_stripes(size: usize, w: usize, packetsize: usize) -> Result<()> {
    if packetsize == 0 {
        return Err(ErasureError::invalid("packetsize must be positive"));
    }
    if size % (w * packetsize) != 0 {
        return Err(ErasureError::invalid(format!(
            "buffer length {} is not a multiple of w * packetsize = {}",
            size,
            w * packetsize
        )));
    }
    Ok(())
}

/// Coefficients a dot product can be taken against
#[derive(Clone, Copy)]
pub(crate) enum Coefficients<'a> {
    Field(&'a Matrix),
    Bits {
        bitmatrix: &'a BitMatrix,
        packetsize: usize,
    },
}

impl Coefficients<'_> {
    pub(crate) fn dotprod(&self, row: usize, sources: &[&[u8]], dest: &mut [u8]) -> Result<()> {
        match *self {
            Coefficients::Field(matrix) => {
                matrix_dotprod(matrix.field(), matrix.row(row), sources, dest)
            }
            Coefficients::Bits {
                bitmatrix,
                packetsize,
            } => bitmatrix_dotprod(bitmatrix, row, sources, dest, packetsize),
        }
    }
}

/// Run one dot product per `(row, dest)` job against the same sources
pub(crate) fn run_rows(
    coefficients: Coefficients<'_>,
    sources: &[&[u8]],
    jobs: Vec<(usize, &mut [u8])>,
    parallel: bool,
) -> Result<()> {
    if parallel && jobs.len() > 1 {
        jobs.into_par_iter()
            .try_for_each(|(row, dest)| coefficients.dotprod(row, sources, dest))
    } else {
        jobs.into_iter()
            .try_for_each(|(row, dest)| coefficients.dotprod(row, sources, dest))
    }
}

/// Borrow every buffer and check they share one length
pub(crate) fn collect_buffers<'a, D, C>(
    data: &'a [D],
    coding: &'a mut [C],
) -> Result<(Vec<&'a [u8]>, Vec<&'a mut [u8]>, usize)>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    let sources: Vec<&[u8]> = data.iter().map(AsRef::as_ref).collect();
    let dests: Vec<&mut [u8]> = coding.iter_mut().map(AsMut::as_mut).collect();
    let size = sources
        .first()
        .map(|s| s.len())
        .ok_or_else(|| ErasureError::invalid("k must be positive"))?;
    if sources.iter().any(|s| s.len() != size) || dests.iter().any(|d| d.len() != size) {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }
    Ok((sources, dests, size))
}

fn check_device_counts(k: usize, m: usize, data: usize, coding: usize) -> Result<()> {
    if data != k || coding != m {
        return Err(ErasureError::invalid(format!(
            "code expects {} data and {} coding buffers, got {} and {}",
            k, m, data, coding
        )));
    }
    Ok(())
}

/// Fill `coding` from `data` with an m x k field matrix (w ∈ {8, 16, 32})
pub fn matrix_encode<D, C>(matrix: &Matrix, data: &[D], coding: &mut [C]) -> Result<()>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    matrix_encode_with(matrix, data, coding, false)
}

pub(crate) fn matrix_encode_with<D, C>(
    matrix: &Matrix,
    data: &[D],
    coding: &mut [C],
    parallel: bool,
) -> Result<()>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    check_device_counts(matrix.cols(), matrix.rows(), data.len(), coding.len())?;
    let word = matrix.field().region_word_bytes()?;
    let (sources, dests, size) = collect_buffers(data, coding)?;
    if size % word != 0 {
        return Err(ErasureError::invalid(format!(
            "buffer length {} is not a multiple of {} bytes",
            size, word
        )));
    }
    let jobs = dests.into_iter().enumerate().collect();
    run_rows(Coefficients::Field(matrix), &sources, jobs, parallel)
}

/// Fill `coding` from `data` with an (m*w) x (k*w) bitmatrix
pub fn bitmatrix_encode<D, C>(
    bitmatrix: &BitMatrix,
    data: &[D],
    coding: &mut [C],
    packetsize: usize,
) -> Result<()>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    bitmatrix_encode_with(bitmatrix, data, coding, packetsize, false)
}

pub(crate) fn bitmatrix_encode_with<D, C>(
    bitmatrix: &BitMatrix,
    data: &[D],
    coding: &mut [C],
    packetsize: usize,
    parallel: bool,
) -> Result<()>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    let w = bitmatrix.w() as usize;
    if bitmatrix.rows() % w != 0 || bitmatrix.cols() % w != 0 {
        return Err(ErasureError::invalid(format!(
            "{}x{} bitmatrix is not made of {}x{} blocks",
            bitmatrix.rows(),
            bitmatrix.cols(),
            w,
            w
        )));
    }
    check_device_counts(bitmatrix.cols() / w, bitmatrix.rows() / w, data.len(), coding.len())?;
    let (sources, dests, size) = collect_buffers(data, coding)?;
    check_stripes(size, w, packetsize)?;
    let jobs = dests.into_iter().enumerate().collect();
    run_rows(
        Coefficients::Bits {
            bitmatrix,
            packetsize,
        },
        &sources,
        jobs,
        parallel,
    )
}

/// Single parity: `parity = data[0] ^ data[1] ^ ...`
pub fn do_parity<D: AsRef<[u8]>>(data: &[D], parity: &mut [u8]) -> Result<()> {
    let (first, rest) = data
        .split_first()
        .ok_or_else(|| ErasureError::invalid("k must be positive"))?;
    let size = parity.len();
    if first.as_ref().len() != size || rest.iter().any(|d| d.as_ref().len() != size) {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }
    parity.copy_from_slice(first.as_ref());
    stats::record_copy(size);
    for d in rest {
        xor_into(d.as_ref(), parity);
        stats::record_xor(size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmatrix::matrix_to_bitmatrix;

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    #[test]
    fn test_matrix_dotprod_mixes_copy_xor_and_multiply() {
        let gf = GaloisField::new(8).unwrap();
        let a = pattern(16, 1);
        let b = pattern(16, 2);
        let c = pattern(16, 3);
        let mut dest = vec![0xFFu8; 16];
        matrix_dotprod(gf, &[3, 1, 0], &[&a, &b, &c], &mut dest).unwrap();
        for i in 0..16 {
            let expected = gf.multiply(3, a[i] as u32) as u8 ^ b[i];
            assert_eq!(dest[i], expected);
        }
    }

    #[test]
    fn test_matrix_dotprod_zero_row_writes_zeros() {
        let gf = GaloisField::new(16).unwrap();
        let a = pattern(8, 9);
        let mut dest = vec![0xAAu8; 8];
        matrix_dotprod(gf, &[0], &[&a], &mut dest).unwrap();
        assert!(dest.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_matrix_dotprod_validation() {
        let gf = GaloisField::new(16).unwrap();
        let a = pattern(8, 1);
        let mut odd = vec![0u8; 7];
        assert!(matrix_dotprod(gf, &[2], &[&a[..7]], &mut odd).is_err());
        let mut dest = vec![0u8; 8];
        assert!(matrix_dotprod(gf, &[2, 3], &[&a], &mut dest).is_err());
        let gf4 = GaloisField::new(4).unwrap();
        assert!(matrix_dotprod(gf4, &[2], &[&a], &mut dest).is_err());
    }

    #[test]
    fn test_bitmatrix_encode_matches_matrix_encode() {
        let matrix = Matrix::from_vec(2, 3, 8, vec![1, 1, 1, 1, 2, 3]).unwrap();
        let bitmatrix = matrix_to_bitmatrix(&matrix).unwrap();
        let data: Vec<Vec<u8>> = (0..3).map(|s| pattern(64, s)).collect();

        let mut by_matrix = vec![vec![0u8; 64]; 2];
        matrix_encode(&matrix, &data, &mut by_matrix).unwrap();

        // With packetsize 1 each stripe is one w-bit word, bit l in packet l
        let mut bit_data: Vec<Vec<u8>> = Vec::new();
        for d in &data {
            let mut sliced = vec![0u8; 64 * 8];
            for (i, &byte) in d.iter().enumerate() {
                for l in 0..8 {
                    sliced[i * 8 + l] = (byte >> l) & 1;
                }
            }
            bit_data.push(sliced);
        }
        let mut by_bits = vec![vec![0u8; 64 * 8]; 2];
        bitmatrix_encode(&bitmatrix, &bit_data, &mut by_bits, 1).unwrap();

        for (word_out, bit_out) in by_matrix.iter().zip(&by_bits) {
            for (i, &byte) in word_out.iter().enumerate() {
                for l in 0..8 {
                    assert_eq!(bit_out[i * 8 + l], (byte >> l) & 1);
                }
            }
        }
    }

    #[test]
    fn test_bitmatrix_encode_validation() {
        let matrix = Matrix::from_vec(1, 2, 8, vec![1, 2]).unwrap();
        let bitmatrix = matrix_to_bitmatrix(&matrix).unwrap();
        let data = vec![vec![0u8; 64]; 2];
        let mut coding = vec![vec![0u8; 64]];
        assert!(bitmatrix_encode(&bitmatrix, &data, &mut coding, 0).is_err());
        assert!(bitmatrix_encode(&bitmatrix, &data, &mut coding, 3).is_err());
        assert!(bitmatrix_encode(&bitmatrix, &data[..1], &mut coding, 8).is_err());
        assert!(bitmatrix_encode(&bitmatrix, &data, &mut coding, 8).is_ok());
    }

    #[test]
    fn test_matrix_encode_parallel_matches_sequential() {
        let matrix = Matrix::from_vec(3, 2, 32, vec![1, 1, 1, 2, 7, 0x1234_5678]).unwrap();
        let data: Vec<Vec<u8>> = (0..2).map(|s| pattern(128, s)).collect();
        let mut seq = vec![vec![0u8; 128]; 3];
        let mut par = vec![vec![0u8; 128]; 3];
        matrix_encode_with(&matrix, &data, &mut seq, false).unwrap();
        matrix_encode_with(&matrix, &data, &mut par, true).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_do_parity() {
        let data = vec![vec![1u8, 2], vec![4u8, 8], vec![16u8, 32]];
        let mut parity = vec![0u8; 2];
        do_parity(&data, &mut parity).unwrap();
        assert_eq!(parity, vec![21, 42]);
        let empty: Vec<Vec<u8>> = Vec::new();
        assert!(do_parity(&empty, &mut parity).is_err());
    }

    #[test]
    fn test_stats_record_xor_work() {
        let data = vec![vec![1u8; 32], vec![2u8; 32]];
        let mut parity = vec![0u8; 32];
        let before = stats::snapshot();
        do_parity(&data, &mut parity).unwrap();
        let after = stats::snapshot();
        assert!(after.xor_bytes >= before.xor_bytes + 32);
        assert!(after.copy_bytes >= before.copy_bytes + 32);
    }
}
