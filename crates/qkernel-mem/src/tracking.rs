//! High-water mark tracking for arena byte usage.

/// Records the largest byte count ever observed. Kernels are single-owner, so
/// this is a plain counter rather than an atomic.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeakTracker {
    peak_bytes: usize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record(&mut self, used_bytes: usize) {
        if used_bytes > self.peak_bytes {
            self.peak_bytes = used_bytes;
            #[cfg(feature = "tracing")]
            tracing::trace!(peak = used_bytes, "arena peak");
        }
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes
    }
}
