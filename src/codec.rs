//! Configured erasure codes
//!
//! [`ErasureCodeBuilder`] binds a [`CodeFamily`], `(k, m, w)`, a technique
//! and a [`CodecConfig`] into an [`ErasureCode`] whose `encode`/`decode`
//! dispatch to the matrix or bitmatrix kernels.
//!
//! ```
//! use gferasure::{CodeFamily, ErasureCodeBuilder};
//!
//! let code = ErasureCodeBuilder::new(4, 2)
//!     .family(CodeFamily::ReedSolVandermonde)
//!     .w(8)
//!     .build()
//!     .unwrap();
//!
//! let data = vec![vec![1u8; 64], vec![2u8; 64], vec![3u8; 64], vec![4u8; 64]];
//! let mut coding = vec![vec![0u8; 64]; 2];
//! code.encode(&data, &mut coding).unwrap();
//!
//! let mut damaged = data.clone();
//! damaged[1].fill(0);
//! code.decode(&[1], &mut damaged, &mut coding).unwrap();
//! assert_eq!(damaged, data);
//! ```

use crate::bitmatrix::BitMatrix;
use crate::codes::{reed_sol_r6_encode, CodeFamily, Generator};
use crate::config::CodecConfig;
use crate::decode::{bitmatrix_decode_with, matrix_decode_with};
use crate::encode::{bitmatrix_encode_with, matrix_encode_with};
use crate::error::{ErasureError, Result};
use crate::matrix::Matrix;
use log::{debug, warn};
use rayon::ThreadPool;

/// How a code is applied to buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    /// GF(2^w) dot products, w ∈ {8, 16, 32}
    Matrix,
    /// XOR-only dot products over packets of `packetsize` bytes
    Bitmatrix { packetsize: usize },
}

#[derive(Debug, Clone)]
pub struct ErasureCodeBuilder {
    k: usize,
    m: usize,
    w: u32,
    family: CodeFamily,
    technique: Option<Technique>,
    config: CodecConfig,
}

impl ErasureCodeBuilder {
    /// Builder for `k` data and `m` coding devices, defaulting to
    /// Reed-Solomon over GF(2^8)
    pub fn new(k: usize, m: usize) -> Self {
        Self {
            k,
            m,
            w: 8,
            family: CodeFamily::ReedSolVandermonde,
            technique: None,
            config: CodecConfig::default(),
        }
    }

    pub fn w(mut self, w: u32) -> Self {
        self.w = w;
        self
    }

    pub fn family(mut self, family: CodeFamily) -> Self {
        self.family = family;
        self
    }

    /// Choose the technique
    ///
    /// Defaults to `Matrix` for field families. XOR-only families must use
    /// `Bitmatrix`.
    pub fn technique(mut self, technique: Technique) -> Self {
        self.technique = Some(technique);
        self
    }

    /// Shorthand for `technique(Technique::Bitmatrix { packetsize })`
    pub fn packetsize(self, packetsize: usize) -> Self {
        self.technique(Technique::Bitmatrix { packetsize })
    }

    pub fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ErasureCode> {
        let technique = match (self.technique, self.family.is_xor_only()) {
            (Some(Technique::Matrix), true) => {
                return Err(ErasureError::invalid(format!(
                    "{} codes only have a bitmatrix form",
                    self.family
                )))
            }
            (Some(t), _) => t,
            (None, false) => Technique::Matrix,
            (None, true) => {
                return Err(ErasureError::invalid(format!(
                    "{} codes need a packetsize",
                    self.family
                )))
            }
        };
        if let Technique::Bitmatrix { packetsize: 0 } = technique {
            return Err(ErasureError::invalid("packetsize must be positive"));
        }

        let generator = self.family.build(self.k, self.m, self.w)?;
        let applied = match technique {
            Technique::Matrix => {
                let matrix = match generator {
                    Generator::Matrix(matrix) => matrix,
                    Generator::Bitmatrix(_) => {
                        return Err(ErasureError::invalid("bitmatrix codes need a packetsize"))
                    }
                };
                matrix.field().region_word_bytes()?;
                Applied::Matrix(matrix)
            }
            Technique::Bitmatrix { packetsize } => Applied::Bitmatrix {
                bitmatrix: generator.to_bitmatrix()?,
                packetsize,
            },
        };

        let pool = build_pool(&self.config);
        debug!(
            "built {} code k={} m={} w={} technique={:?} threads={}",
            self.family,
            self.k,
            self.m,
            self.w,
            technique,
            self.config.effective_threads()
        );

        Ok(ErasureCode {
            k: self.k,
            m: self.m,
            w: self.w,
            family: self.family,
            applied,
            config: self.config,
            pool,
        })
    }
}

fn build_pool(config: &CodecConfig) -> Option<ThreadPool> {
    if !config.is_parallel() {
        return None;
    }
    let threads = config.effective_threads();
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(
                "could not build a {}-thread pool ({}), using the global pool",
                threads, e
            );
            None
        }
    }
}

#[derive(Debug)]
enum Applied {
    Matrix(Matrix),
    Bitmatrix {
        bitmatrix: BitMatrix,
        packetsize: usize,
    },
}

/// A built code ready to encode and decode
pub struct ErasureCode {
    k: usize,
    m: usize,
    w: u32,
    family: CodeFamily,
    applied: Applied,
    config: CodecConfig,
    pool: Option<ThreadPool>,
}

impl std::fmt::Debug for ErasureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasureCode")
            .field("k", &self.k)
            .field("m", &self.m)
            .field("w", &self.w)
            .field("family", &self.family)
            .field("technique", &self.technique())
            .field("config", &self.config)
            .finish()
    }
}

impl ErasureCode {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn family(&self) -> CodeFamily {
        self.family
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn technique(&self) -> Technique {
        match &self.applied {
            Applied::Matrix(_) => Technique::Matrix,
            Applied::Bitmatrix { packetsize, .. } => Technique::Bitmatrix {
                packetsize: *packetsize,
            },
        }
    }

    /// The field matrix, for matrix-technique codes
    pub fn matrix(&self) -> Option<&Matrix> {
        match &self.applied {
            Applied::Matrix(matrix) => Some(matrix),
            Applied::Bitmatrix { .. } => None,
        }
    }

    /// The bitmatrix, for bitmatrix-technique codes
    pub fn bitmatrix(&self) -> Option<&BitMatrix> {
        match &self.applied {
            Applied::Matrix(_) => None,
            Applied::Bitmatrix { bitmatrix, .. } => Some(bitmatrix),
        }
    }

    /// Whether decode may use the all-ones first coding row
    pub fn row_k_ones(&self) -> bool {
        self.family.row_k_ones()
    }

    fn run<T: Send>(&self, f: impl FnOnce(bool) -> T + Send) -> T {
        let parallel = self.config.is_parallel();
        match &self.pool {
            Some(pool) => pool.install(|| f(parallel)),
            None => f(parallel),
        }
    }

    /// Compute every coding buffer from the data buffers
    pub fn encode<D, C>(&self, data: &[D], coding: &mut [C]) -> Result<()>
    where
        D: AsRef<[u8]> + Sync,
        C: AsMut<[u8]> + Send,
    {
        match &self.applied {
            Applied::Matrix(_) if self.family == CodeFamily::R6 => {
                reed_sol_r6_encode(self.w, data, coding)
            }
            Applied::Matrix(matrix) => {
                self.run(|parallel| matrix_encode_with(matrix, data, coding, parallel))
            }
            Applied::Bitmatrix {
                bitmatrix,
                packetsize,
            } => self.run(|parallel| {
                bitmatrix_encode_with(bitmatrix, data, coding, *packetsize, parallel)
            }),
        }
    }

    /// Rebuild the devices listed in `erasures` in place
    pub fn decode<D, C>(&self, erasures: &[usize], data: &mut [D], coding: &mut [C]) -> Result<()>
    where
        D: AsMut<[u8]> + Send,
        C: AsMut<[u8]> + Send,
    {
        let row_k_ones = self.row_k_ones();
        match &self.applied {
            Applied::Matrix(matrix) => self.run(|parallel| {
                matrix_decode_with(matrix, row_k_ones, erasures, data, coding, parallel)
            }),
            Applied::Bitmatrix {
                bitmatrix,
                packetsize,
            } => self.run(|parallel| {
                bitmatrix_decode_with(
                    bitmatrix,
                    row_k_ones,
                    erasures,
                    data,
                    coding,
                    *packetsize,
                    parallel,
                )
            }),
        }
    }
}
