//! Erasure coding over GF(2^w)
//!
//! `k` data buffers are combined into `m` coding buffers so that any
//! pattern of up to `m` lost buffers can be rebuilt. Codes are described
//! either by an `m x k` matrix over GF(2^w) or by its `mw x kw` bitmatrix
//! expansion, which encodes with XOR alone.

pub mod bitmatrix;
pub mod codec;
pub mod codes;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod galois;
pub mod invert;
pub mod matrix;
pub mod stats;

pub use bitmatrix::{matrix_to_bitmatrix, BitMatrix};
pub use codec::{ErasureCode, ErasureCodeBuilder, Technique};
pub use codes::{CodeFamily, Generator};
pub use config::CodecConfig;
pub use decode::{
    bitmatrix_decode, erasures_from_terminated, erasures_to_erased, make_decoding_bitmatrix,
    make_decoding_matrix, matrix_decode, DecodingBitmatrix, DecodingMatrix,
};
pub use encode::{bitmatrix_dotprod, bitmatrix_encode, do_parity, matrix_dotprod, matrix_encode};
pub use error::{ErasureError, ErrorKind, Result};
pub use galois::{GaloisField, MultStrategy, WriteOp};
pub use invert::{invert_bitmatrix, invert_matrix, is_invertible, is_invertible_bitmatrix};
pub use matrix::Matrix;
pub use stats::OpStats;
