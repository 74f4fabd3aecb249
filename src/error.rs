//! Error types for erasure coding operations

use thiserror::Error;

/// Broad classification of an [`ErasureError`]
///
/// Callers that only need to decide between "fix the parameters" and
/// "the data is gone" can match on this instead of the full enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter violates a precondition (bad k/m/w, bad buffer sizes,
    /// bad erasure indices, division by zero)
    InvalidArgument,
    /// Backing storage could not be obtained
    AllocationFailure,
    /// The erasure pattern defeats the code
    Unrecoverable,
}

/// Errors that can occur during field arithmetic, matrix construction,
/// encoding or decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErasureError {
    /// Field width outside 1..=32, or outside what an operation supports
    #[error("unsupported field width w={0}")]
    UnsupportedWidth(u32),

    /// A parameter violates a code family or operation precondition
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Division (or inversion) of zero in GF(2^w)
    #[error("division by zero in GF(2^{w})")]
    DivisionByZero { w: u32 },

    /// Storage for a table, matrix or buffer could not be reserved
    #[error("could not allocate {elements} elements")]
    AllocationFailure { elements: usize },

    /// Gauss-Jordan elimination found a pivot column with no non-zero entry
    #[error("matrix is not invertible")]
    NotInvertible,

    /// Erasure pattern exceeds what the code can repair
    #[error("unrecoverable erasure pattern: {0}")]
    Unrecoverable(String),
}

impl ErasureError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ErasureError::InvalidArgument(msg.into())
    }

    /// Map the error onto the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErasureError::UnsupportedWidth(_)
            | ErasureError::InvalidArgument(_)
            | ErasureError::DivisionByZero { .. } => ErrorKind::InvalidArgument,
            ErasureError::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            ErasureError::NotInvertible | ErasureError::Unrecoverable(_) => {
                ErrorKind::Unrecoverable
            }
        }
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.kind() == ErrorKind::Unrecoverable
    }
}

/// Type alias for Result with ErasureError
pub type Result<T> = std::result::Result<T, ErasureError>;

/// Allocate a vector of `len` copies of `value`, reporting failure instead of aborting
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| ErasureError::AllocationFailure { elements: len })?;
    v.resize(len, value);
    Ok(v)
}
