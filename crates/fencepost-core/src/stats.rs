//! Aggregate allocation statistics.

use std::fmt;

use serde::Serialize;

/// Snapshot of the debugger's counters.
///
/// Everything except `active_count`/`active_bytes` only grows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Blocks currently live.
    pub active_count: u64,
    /// User bytes currently live.
    pub active_bytes: u64,
    /// Successful allocations ever.
    pub total_count: u64,
    /// User bytes ever successfully allocated.
    pub total_bytes: u64,
    /// Failed allocation requests.
    pub fail_count: u64,
    /// Bytes asked for by failed requests (saturating).
    pub fail_bytes: u64,
    /// Lowest user byte ever returned, or 0 before the first success.
    pub heap_min: usize,
    /// Highest user byte ever returned, or 0 before the first success.
    pub heap_max: usize,
}

/// Which release counters would have gone negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReleaseUnderflow {
    pub(crate) count: bool,
    pub(crate) bytes: bool,
}

impl Statistics {
    pub(crate) fn record_success(&mut self, size: usize) {
        let size = size as u64;
        self.active_count = self.active_count.saturating_add(1);
        self.active_bytes = self.active_bytes.saturating_add(size);
        self.total_count = self.total_count.saturating_add(1);
        self.total_bytes = self.total_bytes.saturating_add(size);
    }

    pub(crate) fn record_failure(&mut self, requested: u64) {
        self.fail_count = self.fail_count.saturating_add(1);
        self.fail_bytes = self.fail_bytes.saturating_add(requested);
    }

    /// Count a validated release, clamping at zero and reporting any clamp.
    pub(crate) fn record_release(&mut self, size: usize) -> ReleaseUnderflow {
        let mut underflow = ReleaseUnderflow::default();
        match self.active_count.checked_sub(1) {
            Some(next) => self.active_count = next,
            None => underflow.count = true,
        }
        match self.active_bytes.checked_sub(size as u64) {
            Some(next) => self.active_bytes = next,
            None => {
                self.active_bytes = 0;
                underflow.bytes = true;
            }
        }
        underflow
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "alloc count: active {:>10}   total {:>10}   fail {:>10}",
            self.active_count, self.total_count, self.fail_count
        )?;
        write!(
            f,
            "alloc size:  active {:>10}   total {:>10}   fail {:>10}",
            self.active_bytes, self.total_bytes, self.fail_bytes
        )
    }
}
