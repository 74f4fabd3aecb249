//! Running byte counters for the dot-product kernels
//!
//! Every encode and decode kernel adds the number of bytes it XORed, multiplied
//! in GF(2^w) or copied. The counters are process-wide and lock-free; callers
//! read them with [`snapshot`] or read-and-reset them with [`take`].

use std::sync::atomic::{AtomicU64, Ordering};

static XOR_BYTES: AtomicU64 = AtomicU64::new(0);
static GF_BYTES: AtomicU64 = AtomicU64::new(0);
static COPY_BYTES: AtomicU64 = AtomicU64::new(0);

/// Counter values at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Bytes XORed into a destination
    pub xor_bytes: u64,
    /// Bytes multiplied by a field constant
    pub gf_bytes: u64,
    /// Bytes copied unchanged
    pub copy_bytes: u64,
}

impl OpStats {
    pub fn total(&self) -> u64 {
        self.xor_bytes + self.gf_bytes + self.copy_bytes
    }
}

#[inline]
pub(crate) fn record_xor(bytes: usize) {
    XOR_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_gf(bytes: usize) {
    GF_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_copy(bytes: usize) {
    COPY_BYTES.fetch_add(bytes as u64, Ordering::Relaxed);
}

/// Current counter values
pub fn snapshot() -> OpStats {
    OpStats {
        xor_bytes: XOR_BYTES.load(Ordering::Relaxed),
        gf_bytes: GF_BYTES.load(Ordering::Relaxed),
        copy_bytes: COPY_BYTES.load(Ordering::Relaxed),
    }
}

/// Current counter values, resetting every counter to zero
pub fn take() -> OpStats {
    OpStats {
        xor_bytes: XOR_BYTES.swap(0, Ordering::Relaxed),
        gf_bytes: GF_BYTES.swap(0, Ordering::Relaxed),
        copy_bytes: COPY_BYTES.swap(0, Ordering::Relaxed),
    }
}
