//! Reed-Solomon coding matrices derived from Vandermonde matrices, and the
//! RAID-6 (m = 2) special case
//!
//! ## Distribution matrix
//!
//! An extended Vandermonde matrix with `k + m` rows and `k` columns has every
//! k x k row subset invertible. Column operations preserve that property, so
//! reducing the top k x k block to the identity yields a systematic
//! distribution matrix whose bottom `m` rows are the coding matrix. Further
//! column and row scaling makes the first coding row and first coding column
//! all ones.

use crate::error::{ErasureError, Result};
use crate::galois::{GaloisField, MAX_LOG_TABLE_WIDTH};
use crate::matrix::Matrix;
use crate::stats;
use log::debug;

/// Extended Vandermonde matrix
///
/// Row 0 is `[1, 0, ..., 0]`, the last row is `[0, ..., 0, 1]` and row `i`
/// in between is `[1, i, i^2, ...]`.
pub fn reed_sol_extended_vandermonde_matrix(rows: usize, cols: usize, w: u32) -> Result<Matrix> {
    let gf = GaloisField::new(w)?;
    if rows == 0 || cols == 0 {
        return Err(ErasureError::invalid("matrix must have at least one row and column"));
    }
    if w <= MAX_LOG_TABLE_WIDTH && (rows as u64 > gf.size() || cols as u64 > gf.size()) {
        return Err(ErasureError::invalid(format!(
            "{}x{} Vandermonde matrix does not fit GF(2^{})",
            rows, cols, w
        )));
    }

    let mut vdm = Matrix::zeroed(rows, cols, w)?;
    vdm.set(0, 0, 1);
    if rows == 1 {
        return Ok(vdm);
    }
    vdm.set(rows - 1, cols - 1, 1);

    for i in 1..rows - 1 {
        let mut power = 1;
        for j in 0..cols {
            vdm.set(i, j, power);
            power = gf.multiply(power, i as u32);
        }
    }
    Ok(vdm)
}

/// Systematic distribution matrix: identity on top, ones in the first
/// coding row and column
pub fn reed_sol_big_vandermonde_distribution_matrix(
    rows: usize,
    cols: usize,
    w: u32,
) -> Result<Matrix> {
    if cols >= rows {
        return Err(ErasureError::invalid(format!(
            "distribution matrix needs more rows than columns, got {}x{}",
            rows, cols
        )));
    }
    let mut dist = reed_sol_extended_vandermonde_matrix(rows, cols, w)?;
    let gf = dist.field();

    // Column-reduce the top cols x cols block to the identity
    for i in 1..cols {
        let pivot = (i..rows).find(|&r| dist.get(r, i) != 0).ok_or_else(|| {
            ErasureError::invalid(format!(
                "cannot build a {}x{} distribution matrix over GF(2^{})",
                rows, cols, w
            ))
        })?;
        dist.swap_rows(i, pivot);

        let diag = dist.get(i, i);
        if diag != 1 {
            let scale = gf.inverse(diag)?;
            for r in 0..rows {
                dist.set(r, i, gf.multiply(scale, dist.get(r, i)));
            }
        }

        for j in (0..cols).filter(|&j| j != i) {
            let e = dist.get(i, j);
            if e == 0 {
                continue;
            }
            for r in 0..rows {
                let v = dist.get(r, j) ^ gf.multiply(e, dist.get(r, i));
                dist.set(r, j, v);
            }
        }
    }

    // Row `cols` all ones: scale each column below the identity
    for j in 0..cols {
        let e = dist.get(cols, j);
        if e != 1 {
            let scale = gf.inverse(e)?;
            for r in cols..rows {
                dist.set(r, j, gf.multiply(scale, dist.get(r, j)));
            }
        }
    }

    // Column 0 all ones: scale each later coding row
    for r in cols + 1..rows {
        let e = dist.get(r, 0);
        if e != 1 {
            let scale = gf.inverse(e)?;
            for j in 0..cols {
                dist.set(r, j, gf.multiply(dist.get(r, j), scale));
            }
        }
    }

    Ok(dist)
}

/// m x k Reed-Solomon coding matrix: the bottom rows of the distribution
/// matrix with `k + m` rows
pub fn reed_sol_vandermonde_coding_matrix(k: usize, m: usize, w: u32) -> Result<Matrix> {
    if k == 0 || m == 0 {
        return Err(ErasureError::invalid("k and m must be positive"));
    }
    let dist = reed_sol_big_vandermonde_distribution_matrix(k + m, k, w)?;
    debug!("built {}x{} vandermonde coding matrix over GF(2^{})", m, k, w);
    dist.sub_rows(k, m)
}

fn check_r6_width(w: u32) -> Result<GaloisField> {
    match w {
        8 | 16 | 32 => GaloisField::new(w),
        _ => Err(ErasureError::UnsupportedWidth(w)),
    }
}

/// RAID-6 coding matrix: row 0 all ones, row 1 = `[1, 2, 4, ..., 2^(k-1)]`
pub fn reed_sol_r6_coding_matrix(k: usize, w: u32) -> Result<Matrix> {
    let gf = check_r6_width(w)?;
    if k == 0 {
        return Err(ErasureError::invalid("k must be positive"));
    }
    if (k + 2) as u64 > gf.size() {
        return Err(ErasureError::invalid(format!(
            "k + 2 = {} exceeds 2^{}",
            k + 2,
            w
        )));
    }
    let mut matrix = Matrix::zeroed(2, k, w)?;
    let mut power = 1;
    for j in 0..k {
        matrix.set(0, j, 1);
        matrix.set(1, j, power);
        power = gf.multiply_by_two(power);
    }
    Ok(matrix)
}

/// Multiply every w-bit little-endian word of `region` by 2
pub fn region_multiply_by_two(region: &mut [u8], w: u32) -> Result<()> {
    let gf = check_r6_width(w)?;
    let word = gf.region_word_bytes()?;
    if region.len() % word != 0 {
        return Err(ErasureError::invalid(format!(
            "region length {} is not a multiple of {} bytes",
            region.len(),
            word
        )));
    }
    match w {
        8 => {
            let poly = gf.primitive_polynomial() as u8;
            for b in region.iter_mut() {
                *b = (*b << 1) ^ if *b & 0x80 != 0 { poly } else { 0 };
            }
        }
        16 => {
            for c in region.chunks_exact_mut(2) {
                let v = gf.multiply_by_two(u16::from_le_bytes([c[0], c[1]]) as u32) as u16;
                c.copy_from_slice(&v.to_le_bytes());
            }
        }
        _ => {
            for c in region.chunks_exact_mut(4) {
                let v = gf.multiply_by_two(u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
                c.copy_from_slice(&v.to_le_bytes());
            }
        }
    }
    Ok(())
}

/// Compute P (plain XOR) and Q (Horner's rule with multiply-by-two) parity
///
/// Produces the same bytes as encoding with [`reed_sol_r6_coding_matrix`].
pub fn reed_sol_r6_encode<D, C>(w: u32, data: &[D], coding: &mut [C]) -> Result<()>
where
    D: AsRef<[u8]>,
    C: AsMut<[u8]>,
{
    let gf = check_r6_width(w)?;
    let word = gf.region_word_bytes()?;
    if data.is_empty() {
        return Err(ErasureError::invalid("k must be positive"));
    }
    let coding_count = coding.len();
    let [p, q] = coding else {
        return Err(ErasureError::invalid(format!(
            "R6 needs exactly 2 coding buffers, got {}",
            coding_count
        )));
    };
    let (p, q) = (p.as_mut(), q.as_mut());
    let size = data[0].as_ref().len();
    if data.iter().any(|d| d.as_ref().len() != size) || p.len() != size || q.len() != size {
        return Err(ErasureError::invalid("all buffers must have the same length"));
    }
    if size % word != 0 {
        return Err(ErasureError::invalid(format!(
            "buffer length {} is not a multiple of {} bytes",
            size, word
        )));
    }

    p.copy_from_slice(data[0].as_ref());
    stats::record_copy(size);
    for d in &data[1..] {
        for (x, y) in p.iter_mut().zip(d.as_ref()) {
            *x ^= y;
        }
        stats::record_xor(size);
    }

    let (last, rest) = data.split_last().ok_or_else(|| ErasureError::invalid("k must be positive"))?;
    q.copy_from_slice(last.as_ref());
    stats::record_copy(size);
    for d in rest.iter().rev() {
        region_multiply_by_two(q, w)?;
        for (x, y) in q.iter_mut().zip(d.as_ref()) {
            *x ^= y;
        }
        stats::record_xor(size);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invert::is_invertible;

    #[test]
    fn test_extended_vandermonde_shape() {
        let vdm = reed_sol_extended_vandermonde_matrix(5, 3, 8).unwrap();
        assert_eq!(vdm.row(0), &[1, 0, 0]);
        assert_eq!(vdm.row(4), &[0, 0, 1]);
        assert_eq!(vdm.row(1), &[1, 1, 1]);
        assert_eq!(vdm.row(2), &[1, 2, 4]);
        assert_eq!(vdm.row(3), &[1, 3, 5]);
    }

    #[test]
    fn test_extended_vandermonde_limits() {
        assert!(reed_sol_extended_vandermonde_matrix(17, 3, 4).is_err());
        assert!(reed_sol_extended_vandermonde_matrix(16, 3, 4).is_ok());
        assert!(reed_sol_extended_vandermonde_matrix(0, 3, 8).is_err());
    }

    #[test]
    fn test_distribution_matrix_is_systematic() {
        let (k, m) = (5, 3);
        let dist = reed_sol_big_vandermonde_distribution_matrix(k + m, k, 8).unwrap();
        assert!(dist.sub_rows(0, k).unwrap().is_identity());
        assert!(dist.row_is_ones(k));
        for r in k..k + m {
            assert_eq!(dist.get(r, 0), 1);
        }
        assert!(reed_sol_big_vandermonde_distribution_matrix(3, 3, 8).is_err());
    }

    #[test]
    fn test_every_k_rows_of_distribution_invertible() {
        let (k, m) = (3, 3);
        let dist = reed_sol_big_vandermonde_distribution_matrix(k + m, k, 8).unwrap();
        let n = k + m;
        for a in 0..n {
            for b in a + 1..n {
                for c in b + 1..n {
                    let mut data = Vec::new();
                    for r in [a, b, c] {
                        data.extend_from_slice(dist.row(r));
                    }
                    let sub = Matrix::from_vec(3, 3, 8, data).unwrap();
                    assert!(is_invertible(&sub), "rows {} {} {}", a, b, c);
                }
            }
        }
    }

    #[test]
    fn test_vandermonde_coding_matrix_first_row_and_column_ones() {
        let matrix = reed_sol_vandermonde_coding_matrix(10, 4, 8).unwrap();
        assert_eq!(matrix.rows(), 4);
        assert_eq!(matrix.cols(), 10);
        assert!(matrix.row_is_ones(0));
        assert!((0..4).all(|r| matrix.get(r, 0) == 1));
    }

    #[test]
    fn test_r6_matrix() {
        let matrix = reed_sol_r6_coding_matrix(5, 8).unwrap();
        assert_eq!(matrix.row(0), &[1, 1, 1, 1, 1]);
        assert_eq!(matrix.row(1), &[1, 2, 4, 8, 16]);
        assert!(matches!(
            reed_sol_r6_coding_matrix(5, 7),
            Err(ErasureError::UnsupportedWidth(7))
        ));
        assert!(reed_sol_r6_coding_matrix(0, 8).is_err());
        assert!(reed_sol_r6_coding_matrix(255, 8).is_err());
    }

    #[test]
    fn test_region_multiply_by_two() {
        let mut region = vec![0x80u8, 0x01, 0x40];
        region_multiply_by_two(&mut region, 8).unwrap();
        assert_eq!(region, vec![0x1D, 0x02, 0x80]);

        let mut region = 0x8001u16.to_le_bytes().to_vec();
        region_multiply_by_two(&mut region, 16).unwrap();
        assert_eq!(u16::from_le_bytes([region[0], region[1]]), 0x100B ^ 0x0002);

        let mut odd = vec![0u8; 3];
        assert!(region_multiply_by_two(&mut odd, 16).is_err());
    }

    #[test]
    fn test_r6_encode_parity() {
        let data = vec![vec![1u8, 2, 3, 4], vec![5u8, 6, 7, 8], vec![9u8, 10, 11, 12]];
        let mut coding = vec![vec![0u8; 4]; 2];
        reed_sol_r6_encode(8, &data, &mut coding).unwrap();

        let gf = GaloisField::new(8).unwrap();
        for b in 0..4 {
            let p = data[0][b] ^ data[1][b] ^ data[2][b];
            let q = data[0][b] as u32
                ^ gf.multiply(2, data[1][b] as u32)
                ^ gf.multiply(4, data[2][b] as u32);
            assert_eq!(coding[0][b], p);
            assert_eq!(coding[1][b] as u32, q);
        }
    }

    #[test]
    fn test_r6_encode_validation() {
        let data = vec![vec![0u8; 4]];
        let mut three = vec![vec![0u8; 4]; 3];
        assert!(reed_sol_r6_encode(8, &data, &mut three).is_err());
        let mut short = vec![vec![0u8; 4], vec![0u8; 2]];
        assert!(reed_sol_r6_encode(8, &data, &mut short).is_err());
        let empty: Vec<Vec<u8>> = Vec::new();
        let mut coding = vec![vec![0u8; 4]; 2];
        assert!(reed_sol_r6_encode(8, &empty, &mut coding).is_err());
    }
}
