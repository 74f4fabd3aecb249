//! Configuration for encode and decode operations

/// Configuration for a configured erasure code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Number of worker threads (0 = auto-detect)
    pub threads: usize,
    /// Whether coding rows and erased devices are processed in parallel
    pub parallel: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            threads: 0, // Auto-detect CPU cores
            parallel: true,
        }
    }
}

impl CodecConfig {
    pub fn new(threads: usize, parallel: bool) -> Self {
        Self { threads, parallel }
    }

    /// Single-threaded configuration
    pub fn sequential() -> Self {
        Self::new(1, false)
    }

    /// Get effective thread count (auto-detect if 0)
    pub fn effective_threads(&self) -> usize {
        match (self.parallel, self.threads) {
            (false, _) => 1, // Sequential mode always uses single thread
            (true, 0) => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            (true, n) => n,
        }
    }

    /// Whether work should be fanned out at all
    pub fn is_parallel(&self) -> bool {
        self.effective_threads() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_parallel_auto() {
        let config = CodecConfig::default();
        assert_eq!(config.threads, 0);
        assert!(config.parallel);
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    fn test_sequential_forces_one_thread() {
        assert_eq!(CodecConfig::new(8, false).effective_threads(), 1);
        assert!(!CodecConfig::sequential().is_parallel());
    }

    #[test]
    fn test_explicit_thread_count() {
        let config = CodecConfig::new(3, true);
        assert_eq!(config.effective_threads(), 3);
        assert!(config.is_parallel());
    }
}
