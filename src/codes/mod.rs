//! Coding matrix and bitmatrix builders, one module per code family

pub mod cauchy;
pub mod liberation;
pub mod reed_sol;

pub use cauchy::{
    cauchy_good_general_coding_matrix, cauchy_improve_coding_matrix, cauchy_n_ones,
    cauchy_original_coding_matrix, cauchy_xy_coding_matrix, matrix_n_ones,
};
pub use liberation::{
    blaum_roth_coding_bitmatrix, liber8tion_coding_bitmatrix, liberation_coding_bitmatrix,
};
pub use reed_sol::{
    reed_sol_big_vandermonde_distribution_matrix, reed_sol_extended_vandermonde_matrix,
    reed_sol_r6_coding_matrix, reed_sol_r6_encode, reed_sol_vandermonde_coding_matrix,
    region_multiply_by_two,
};

use crate::bitmatrix::{matrix_to_bitmatrix, BitMatrix};
use crate::error::{ErasureError, Result};
use crate::matrix::Matrix;
use std::fmt;

/// The code families this crate can construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeFamily {
    /// Cauchy matrix over X = {0..m-1}, Y = {m..m+k-1}
    Cauchy,
    /// Cauchy matrix tuned for bitmatrix density
    CauchyGood,
    /// Systematic Reed-Solomon from a Vandermonde distribution matrix
    ReedSolVandermonde,
    /// RAID-6 Reed-Solomon (m = 2, w ∈ {8, 16, 32})
    R6,
    /// Liberation bitmatrix (m = 2, k <= w)
    Liberation,
    /// Liber8tion bitmatrix (m = 2, w = 8, k <= 8)
    Liber8tion,
    /// Blaum-Roth bitmatrix (m = 2, k <= w, w + 1 prime)
    BlaumRoth,
}

impl CodeFamily {
    pub const ALL: [CodeFamily; 7] = [
        CodeFamily::Cauchy,
        CodeFamily::CauchyGood,
        CodeFamily::ReedSolVandermonde,
        CodeFamily::R6,
        CodeFamily::Liberation,
        CodeFamily::Liber8tion,
        CodeFamily::BlaumRoth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CodeFamily::Cauchy => "cauchy",
            CodeFamily::CauchyGood => "cauchy-good",
            CodeFamily::ReedSolVandermonde => "reed-sol-vandermonde",
            CodeFamily::R6 => "reed-sol-r6",
            CodeFamily::Liberation => "liberation",
            CodeFamily::Liber8tion => "liber8tion",
            CodeFamily::BlaumRoth => "blaum-roth",
        }
    }

    /// Whether the family only exists as a bitmatrix
    pub fn is_xor_only(&self) -> bool {
        matches!(
            self,
            CodeFamily::Liberation | CodeFamily::Liber8tion | CodeFamily::BlaumRoth
        )
    }

    /// Whether the first coding row (or block row) is all ones (identities)
    ///
    /// This is what decode's `row_k_ones` flag asserts.
    pub fn row_k_ones(&self) -> bool {
        !matches!(self, CodeFamily::Cauchy)
    }

    /// Build the generator for `k` data and `m` coding devices over GF(2^w)
    pub fn build(&self, k: usize, m: usize, w: u32) -> Result<Generator> {
        let needs_two = matches!(self, CodeFamily::R6) || self.is_xor_only();
        if needs_two && m != 2 {
            return Err(ErasureError::invalid(format!(
                "{} codes have exactly 2 coding devices, got m = {}",
                self.name(),
                m
            )));
        }
        if *self == CodeFamily::Liber8tion && w != 8 {
            return Err(ErasureError::UnsupportedWidth(w));
        }

        let generator = match self {
            CodeFamily::Cauchy => Generator::Matrix(cauchy_original_coding_matrix(k, m, w)?),
            CodeFamily::CauchyGood => {
                Generator::Matrix(cauchy_good_general_coding_matrix(k, m, w)?)
            }
            CodeFamily::ReedSolVandermonde => {
                Generator::Matrix(reed_sol_vandermonde_coding_matrix(k, m, w)?)
            }
            CodeFamily::R6 => Generator::Matrix(reed_sol_r6_coding_matrix(k, w)?),
            CodeFamily::Liberation => Generator::Bitmatrix(liberation_coding_bitmatrix(k, w)?),
            CodeFamily::Liber8tion => Generator::Bitmatrix(liber8tion_coding_bitmatrix(k)?),
            CodeFamily::BlaumRoth => Generator::Bitmatrix(blaum_roth_coding_bitmatrix(k, w)?),
        };
        Ok(generator)
    }
}

impl fmt::Display for CodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A built code: a field matrix or an XOR bitmatrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generator {
    Matrix(Matrix),
    Bitmatrix(BitMatrix),
}

impl Generator {
    pub fn w(&self) -> u32 {
        match self {
            Generator::Matrix(m) => m.w(),
            Generator::Bitmatrix(b) => b.w(),
        }
    }

    /// Number of data devices
    pub fn k(&self) -> usize {
        match self {
            Generator::Matrix(m) => m.cols(),
            Generator::Bitmatrix(b) => b.cols() / b.w() as usize,
        }
    }

    /// Number of coding devices
    pub fn m(&self) -> usize {
        match self {
            Generator::Matrix(m) => m.rows(),
            Generator::Bitmatrix(b) => b.rows() / b.w() as usize,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Generator::Matrix(m) => Some(m),
            Generator::Bitmatrix(_) => None,
        }
    }

    /// Bitmatrix form, expanding a field matrix if needed
    pub fn to_bitmatrix(&self) -> Result<BitMatrix> {
        match self {
            Generator::Matrix(m) => matrix_to_bitmatrix(m),
            Generator::Bitmatrix(b) => Ok(b.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_each_family() {
        let cases = [
            (CodeFamily::Cauchy, 4, 2, 8),
            (CodeFamily::CauchyGood, 4, 3, 8),
            (CodeFamily::ReedSolVandermonde, 6, 3, 16),
            (CodeFamily::R6, 8, 2, 8),
            (CodeFamily::Liberation, 5, 2, 7),
            (CodeFamily::Liber8tion, 6, 2, 8),
            (CodeFamily::BlaumRoth, 4, 2, 6),
        ];
        for (family, k, m, w) in cases {
            let g = family.build(k, m, w).unwrap();
            assert_eq!(g.k(), k, "{}", family);
            assert_eq!(g.m(), m, "{}", family);
            assert_eq!(g.w(), w);
            assert_eq!(g.as_matrix().is_none(), family.is_xor_only());
        }
    }

    #[test]
    fn test_two_parity_families_reject_other_m() {
        for family in [
            CodeFamily::R6,
            CodeFamily::Liberation,
            CodeFamily::Liber8tion,
            CodeFamily::BlaumRoth,
        ] {
            assert!(family.build(4, 3, 8).is_err(), "{}", family);
        }
        assert!(CodeFamily::Liber8tion.build(4, 2, 7).is_err());
    }

    #[test]
    fn test_row_k_ones_matches_built_generators() {
        for family in CodeFamily::ALL {
            let w = if family == CodeFamily::BlaumRoth { 4 } else { 8 };
            let g = family.build(4, 2, w).unwrap();
            let first_row_ones = match &g {
                Generator::Matrix(m) => m.row_is_ones(0),
                Generator::Bitmatrix(b) => b.block_row_is_identity(0),
            };
            assert_eq!(first_row_ones, family.row_k_ones(), "{}", family);
        }
    }

    #[test]
    fn test_to_bitmatrix_dimensions() {
        let g = CodeFamily::ReedSolVandermonde.build(3, 2, 8).unwrap();
        let bm = g.to_bitmatrix().unwrap();
        assert_eq!(bm.rows(), 16);
        assert_eq!(bm.cols(), 24);
    }
}
