//! Cauchy coding matrices
//!
//! Every square submatrix of a Cauchy matrix is invertible, so any `m`
//! erasures are recoverable. The bitmatrix cost of a Cauchy code depends on
//! how many ones each element's bitmatrix carries, which the "improve" and
//! "good" variants try to minimise.

use crate::error::{ErasureError, Result};
use crate::galois::GaloisField;
use crate::matrix::Matrix;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

/// Widest field a Cauchy code can be built over
pub const MAX_CAUCHY_WIDTH: u32 = 30;

/// Widest field for which the m = 2 "good" construction searches all
/// elements
const GOOD_SEARCH_MAX_WIDTH: u32 = 11;

fn check_params(k: usize, m: usize, w: u32) -> Result<GaloisField> {
    if k == 0 {
        return Err(ErasureError::invalid("k must be positive"));
    }
    if m == 0 {
        return Err(ErasureError::invalid("m must be positive"));
    }
    if w > MAX_CAUCHY_WIDTH {
        return Err(ErasureError::UnsupportedWidth(w));
    }
    let gf = GaloisField::new(w)?;
    if (k + m) as u64 > gf.size() {
        return Err(ErasureError::invalid(format!(
            "k + m = {} exceeds 2^{}",
            k + m,
            w
        )));
    }
    Ok(gf)
}

/// Number of ones in the w x w bitmatrix of multiplication by `n`
pub fn cauchy_n_ones(n: u32, w: u32) -> Result<usize> {
    let gf = GaloisField::new(w)?;
    if !gf.contains(n) {
        return Err(ErasureError::invalid(format!(
            "{} is not an element of GF(2^{})",
            n, w
        )));
    }
    Ok(n_ones(gf, n))
}

pub(crate) fn n_ones(gf: GaloisField, n: u32) -> usize {
    let mut cur = n;
    let mut ones = 0;
    for _ in 0..gf.w() {
        ones += cur.count_ones() as usize;
        cur = gf.multiply_by_two(cur);
    }
    ones
}

/// Cauchy matrix over X = {0..m-1}, Y = {m..m+k-1}
pub fn cauchy_original_coding_matrix(k: usize, m: usize, w: u32) -> Result<Matrix> {
    check_params(k, m, w)?;
    let x: Vec<u32> = (0..m as u32).collect();
    let y: Vec<u32> = (m as u32..(m + k) as u32).collect();
    cauchy_xy_coding_matrix(k, m, w, &x, &y)
}

/// Cauchy matrix with entry (i, j) = 1 / (x[i] ^ y[j])
///
/// The elements of `x` and `y` must all be distinct.
pub fn cauchy_xy_coding_matrix(k: usize, m: usize, w: u32, x: &[u32], y: &[u32]) -> Result<Matrix> {
    let gf = check_params(k, m, w)?;
    if x.len() != m || y.len() != k {
        return Err(ErasureError::invalid(format!(
            "expected {} X and {} Y elements, got {} and {}",
            m,
            k,
            x.len(),
            y.len()
        )));
    }
    let mut seen = FxHashSet::default();
    for &v in x.iter().chain(y) {
        if !gf.contains(v) {
            return Err(ErasureError::invalid(format!(
                "{} is not an element of GF(2^{})",
                v, w
            )));
        }
        if !seen.insert(v) {
            return Err(ErasureError::invalid(format!(
                "{} appears more than once in X and Y",
                v
            )));
        }
    }

    let mut matrix = Matrix::zeroed(m, k, w)?;
    for (i, &xi) in x.iter().enumerate() {
        for (j, &yj) in y.iter().enumerate() {
            matrix.set(i, j, gf.divide(1, xi ^ yj)?);
        }
    }
    Ok(matrix)
}

/// Reduce the bitmatrix density of a coding matrix without losing any of
/// its recovery properties
///
/// Columns are scaled so that row 0 is all ones, then each later row is
/// divided by whichever of its entries minimises the row's total bitmatrix
/// ones (first minimum wins, only strict improvements are taken). Zero
/// entries are never used as divisors.
pub fn cauchy_improve_coding_matrix(matrix: &mut Matrix) -> Result<()> {
    let gf = matrix.field();
    let (m, k) = (matrix.rows(), matrix.cols());
    if m == 0 || k == 0 {
        return Ok(());
    }

    for j in 0..k {
        let top = matrix.get(0, j);
        if top > 1 {
            let scale = gf.inverse(top)?;
            for i in 0..m {
                matrix.set(i, j, gf.multiply(matrix.get(i, j), scale));
            }
        }
    }

    let mut memo: FxHashMap<u32, usize> = FxHashMap::default();
    let mut ones = |v: u32| *memo.entry(v).or_insert_with(|| n_ones(gf, v));

    for i in 1..m {
        let row = matrix.row(i).to_vec();
        let mut best = row.iter().map(|&v| ones(v)).sum::<usize>();
        let mut best_divisor = None;

        for &candidate in row.iter().filter(|&&v| v > 1) {
            let scale = gf.inverse(candidate)?;
            let total: usize = row.iter().map(|&v| ones(gf.multiply(v, scale))).sum();
            if total < best {
                best = total;
                best_divisor = Some(scale);
            }
        }

        if let Some(scale) = best_divisor {
            for j in 0..k {
                matrix.set(i, j, gf.multiply(row[j], scale));
            }
        }
    }

    debug!(
        "improved {}x{} cauchy matrix over GF(2^{})",
        m,
        k,
        gf.w()
    );
    Ok(())
}

/// Cauchy matrix tuned for a sparse bitmatrix
///
/// For m = 2 on small fields, row 0 is all ones and row 1 holds the `k`
/// non-zero elements with the sparsest bitmatrices (ties broken by value).
/// Any two distinct non-zero elements keep every 2x2 submatrix invertible.
/// Otherwise this is the original construction followed by
/// [`cauchy_improve_coding_matrix`].
pub fn cauchy_good_general_coding_matrix(k: usize, m: usize, w: u32) -> Result<Matrix> {
    let gf = check_params(k, m, w)?;

    if m == 2 && w <= GOOD_SEARCH_MAX_WIDTH && (k as u64) < gf.size() {
        let mut elements: Vec<(usize, u32)> =
            (1..=gf.max_element()).map(|v| (n_ones(gf, v), v)).collect();
        elements.sort_unstable();

        let mut matrix = Matrix::zeroed(2, k, w)?;
        for (j, &(_, v)) in elements.iter().take(k).enumerate() {
            matrix.set(0, j, 1);
            matrix.set(1, j, v);
        }
        debug!("built sparse m=2 cauchy matrix k={} w={}", k, w);
        return Ok(matrix);
    }

    let mut matrix = cauchy_original_coding_matrix(k, m, w)?;
    cauchy_improve_coding_matrix(&mut matrix)?;
    Ok(matrix)
}

/// Total bitmatrix ones of every entry
pub fn matrix_n_ones(matrix: &Matrix) -> usize {
    let gf = matrix.field();
    matrix.as_slice().iter().map(|&v| n_ones(gf, v)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_ones() {
        assert_eq!(cauchy_n_ones(0, 8).unwrap(), 0);
        assert_eq!(cauchy_n_ones(1, 8).unwrap(), 8);
        // 2 in GF(2^4): x, x^2, x^3, x + 1
        assert_eq!(cauchy_n_ones(2, 4).unwrap(), 5);
        assert!(cauchy_n_ones(16, 4).is_err());
    }

    #[test]
    fn test_original_entries_are_reciprocals() {
        let gf = GaloisField::new(8).unwrap();
        let (k, m) = (4, 3);
        let matrix = cauchy_original_coding_matrix(k, m, 8).unwrap();
        for i in 0..m {
            for j in 0..k {
                let denom = i as u32 ^ (m + j) as u32;
                assert_eq!(gf.multiply(matrix.get(i, j), denom), 1);
            }
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(cauchy_original_coding_matrix(0, 2, 8).is_err());
        assert!(cauchy_original_coding_matrix(2, 0, 8).is_err());
        assert!(matches!(
            cauchy_original_coding_matrix(2, 2, 31),
            Err(ErasureError::UnsupportedWidth(31))
        ));
        // k + m > 2^w
        assert!(cauchy_original_coding_matrix(14, 3, 4).is_err());
        assert!(cauchy_original_coding_matrix(13, 3, 4).is_ok());
    }

    #[test]
    fn test_xy_rejects_repeated_elements() {
        assert!(cauchy_xy_coding_matrix(2, 2, 8, &[1, 2], &[2, 3]).is_err());
        assert!(cauchy_xy_coding_matrix(2, 2, 8, &[1, 2], &[3]).is_err());
        assert!(cauchy_xy_coding_matrix(2, 2, 4, &[1, 2], &[3, 16]).is_err());
        assert!(cauchy_xy_coding_matrix(2, 2, 8, &[1, 2], &[3, 4]).is_ok());
    }

    #[test]
    fn test_improve_makes_row_zero_ones_and_never_adds_ones() {
        for (k, m, w) in [(4, 2, 8), (6, 3, 8), (5, 4, 16)] {
            let original = cauchy_original_coding_matrix(k, m, w).unwrap();
            let mut improved = original.clone();
            cauchy_improve_coding_matrix(&mut improved).unwrap();
            assert!(improved.row_is_ones(0));

            // Column scaling alone is the baseline the row search improves on
            let mut scaled = original.clone();
            let gf = scaled.field();
            for j in 0..k {
                let s = gf.inverse(original.get(0, j)).unwrap();
                for i in 0..m {
                    scaled.set(i, j, gf.multiply(original.get(i, j), s));
                }
            }
            assert!(matrix_n_ones(&improved) <= matrix_n_ones(&scaled));
        }
    }

    #[test]
    fn test_improve_is_deterministic() {
        let mut a = cauchy_original_coding_matrix(7, 3, 8).unwrap();
        let mut b = a.clone();
        cauchy_improve_coding_matrix(&mut a).unwrap();
        cauchy_improve_coding_matrix(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_good_general_m2_uses_sparse_distinct_elements() {
        let matrix = cauchy_good_general_coding_matrix(6, 2, 8).unwrap();
        assert!(matrix.row_is_ones(0));
        let row = matrix.row(1);
        assert_eq!(row[0], 1);
        let distinct: FxHashSet<u32> = row.iter().copied().collect();
        assert_eq!(distinct.len(), 6);
        assert!(row.iter().all(|&v| v != 0));
        let gf = matrix.field();
        for pair in row.windows(2) {
            assert!(n_ones(gf, pair[0]) <= n_ones(gf, pair[1]));
        }
    }

    #[test]
    fn test_good_general_m2_ties_break_by_value() {
        let matrix = cauchy_good_general_coding_matrix(8, 2, 8).unwrap();
        let gf = matrix.field();
        let keys: Vec<(usize, u32)> = matrix.row(1).iter().map(|&v| (n_ones(gf, v), v)).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(matrix.row(1), &[1, 2, 142, 4, 71, 8, 70, 173]);
    }

    #[test]
    fn test_good_general_falls_back_to_improve() {
        let good = cauchy_good_general_coding_matrix(5, 3, 8).unwrap();
        let mut expected = cauchy_original_coding_matrix(5, 3, 8).unwrap();
        cauchy_improve_coding_matrix(&mut expected).unwrap();
        assert_eq!(good, expected);
    }
}
