//! Heap bounds: the lowest and highest user byte ever handed out.
//!
//! The bounds only widen. Freed ranges stay inside them because the raw
//! adapter may hand the same memory out again.

use serde::Serialize;

/// Inclusive address range covering every user byte ever returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapBounds {
    /// Lowest user byte ever returned.
    pub min: usize,
    /// Highest user byte ever returned.
    pub max: usize,
}

impl HeapBounds {
    /// Bounds of a single block. Zero-byte blocks cover their base byte.
    #[must_use]
    pub fn spanning(base: usize, size: usize) -> Self {
        let last = base.saturating_add(size.max(1) - 1);
        Self {
            min: base,
            max: last,
        }
    }

    /// Grow to cover `[base, base + size)`.
    pub fn widen(&mut self, base: usize, size: usize) {
        let block = Self::spanning(base, size);
        self.min = self.min.min(block.min);
        self.max = self.max.max(block.max);
    }

    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        (self.min..=self.max).contains(&addr)
    }
}

/// Running heap bounds; empty until the first successful allocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundsTracker {
    bounds: Option<HeapBounds>,
}

impl BoundsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a block returned to a caller.
    pub fn observe(&mut self, base: usize, size: usize) {
        match &mut self.bounds {
            Some(bounds) => bounds.widen(base, size),
            None => self.bounds = Some(HeapBounds::spanning(base, size)),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<HeapBounds> {
        self.bounds
    }

    /// False for every address until something has been allocated.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.bounds.is_some_and(|bounds| bounds.contains(addr))
    }
}
