//! Allocation ledger and freed-address set.
//!
//! The ledger is the single source of truth for "is this a live block's
//! base". The freed set remembers bases whose last event was a validated
//! release, which is what separates a double free from a wild free. An
//! address is never in both at once.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::site::Site;

/// Metadata for one live block, keyed by its base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationRecord {
    /// User-visible size in bytes (may be 0).
    pub size: usize,
    /// Where the block was allocated.
    pub site: Site,
}

/// A live block that strictly contains some address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Containing {
    /// Base address of the owning block.
    pub base: usize,
    /// Bytes from `base` to the queried address.
    pub offset: usize,
    /// The owning block's record.
    pub record: AllocationRecord,
}

/// Live blocks ordered by base address, plus released bases.
#[derive(Debug, Default, Clone)]
pub struct AllocationLedger {
    live: BTreeMap<usize, AllocationRecord>,
    freed: BTreeSet<usize>,
}

impl AllocationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly allocated block.
    ///
    /// Reuse clears freed status for the base and for any stale freed base
    /// the new block now covers.
    pub fn insert(&mut self, base: usize, record: AllocationRecord) {
        let end = base.saturating_add(record.size.max(1));
        let reused: Vec<usize> = self.freed.range(base..end).copied().collect();
        for addr in reused {
            self.freed.remove(&addr);
        }
        self.live.insert(base, record);
    }

    /// Move a live block to the freed set, returning its record.
    pub fn retire(&mut self, base: usize) -> Option<AllocationRecord> {
        let record = self.live.remove(&base)?;
        self.freed.insert(base);
        Some(record)
    }

    #[must_use]
    pub fn get(&self, base: usize) -> Option<&AllocationRecord> {
        self.live.get(&base)
    }

    /// True when `addr` was released and has not been handed out since.
    #[must_use]
    pub fn was_freed(&self, addr: usize) -> bool {
        self.freed.contains(&addr)
    }

    /// The live block whose user region holds `addr` past its base.
    ///
    /// Blocks never overlap, so only the nearest lower base can qualify.
    #[must_use]
    pub fn containing(&self, addr: usize) -> Option<Containing> {
        let (&base, &record) = self.live.range(..addr).next_back()?;
        let offset = addr - base;
        (offset < record.size).then_some(Containing {
            base,
            offset,
            record,
        })
    }

    /// Live blocks in ascending base order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &AllocationRecord)> + '_ {
        self.live.iter().map(|(&base, record)| (base, record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Sum of user sizes across live blocks.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live.values().map(|record| record.size as u64).sum()
    }

    /// Remove every live block and forget the freed set.
    pub fn take_live(&mut self) -> BTreeMap<usize, AllocationRecord> {
        self.freed.clear();
        std::mem::take(&mut self.live)
    }
}
