//! Property-based tests for matrix inversion over GF(2^w) and GF(2)

use gferasure::{invert_bitmatrix, invert_matrix, is_invertible, BitMatrix, Matrix};
use proptest::prelude::*;

fn region_width() -> impl Strategy<Value = u32> {
    prop::sample::select(vec![8u32, 16, 32])
}

/// Square field matrix with random entries; singular draws are rare for w >= 8
fn field_matrix() -> impl Strategy<Value = Matrix> {
    (region_width(), 1usize..7).prop_flat_map(|(w, n)| {
        prop::collection::vec(any::<u32>(), n * n).prop_map(move |values| {
            let mask = if w == 32 { u32::MAX } else { (1 << w) - 1 };
            let values = values.into_iter().map(|v| v & mask).collect();
            Matrix::from_vec(n, n, w, values).unwrap()
        })
    })
}

/// Invertible bitmatrix built as L * U with unit diagonals, rows rotated
fn invertible_bitmatrix() -> impl Strategy<Value = BitMatrix> {
    (1usize..25, any::<usize>()).prop_flat_map(|(n, rotate)| {
        (
            prop::collection::vec(any::<bool>(), n * n),
            prop::collection::vec(any::<bool>(), n * n),
        )
            .prop_map(move |(lower, upper)| {
                let l = |i: usize, j: usize| i == j || (j < i && lower[i * n + j]);
                let u = |i: usize, j: usize| i == j || (j > i && upper[i * n + j]);
                let mut bits = vec![0u8; n * n];
                for i in 0..n {
                    let row = (i + rotate) % n;
                    for j in 0..n {
                        let bit = (0..n).fold(false, |acc, t| acc ^ (l(i, t) && u(t, j)));
                        bits[row * n + j] = u8::from(bit);
                    }
                }
                BitMatrix::from_bits(n, n, 1, &bits).unwrap()
            })
    })
}

proptest! {
    /// Property: inverting twice returns the original field matrix
    #[test]
    fn prop_double_inverse_is_identity_map(m in field_matrix()) {
        prop_assume!(is_invertible(&m));
        let inv = invert_matrix(&m).unwrap();
        prop_assert!(m.multiply(&inv).unwrap().is_identity());
        prop_assert_eq!(invert_matrix(&inv).unwrap(), m);
    }

    /// Property: inverting a bitmatrix twice returns the original
    #[test]
    fn prop_double_inverse_bitmatrix(bm in invertible_bitmatrix()) {
        let inv = invert_bitmatrix(&bm).unwrap();
        prop_assert_eq!(invert_bitmatrix(&inv).unwrap(), bm);
    }
}

#[test]
fn test_double_inverse_each_region_width() {
    for w in [8u32, 16, 32] {
        let m = Matrix::from_vec(3, 3, w, vec![1, 2, 3, 4, 5, 6, 7, 8, 10]).unwrap();
        assert!(is_invertible(&m), "w={}", w);
        let inv = invert_matrix(&m).unwrap();
        assert_eq!(invert_matrix(&inv).unwrap(), m, "w={}", w);
    }
}
