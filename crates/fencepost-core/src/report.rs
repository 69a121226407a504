//! Leak and heavy-hitter reports.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::site::Site;

/// One block still live when the leak report was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeakEntry {
    pub site: Site,
    pub base: usize,
    pub size: usize,
}

impl fmt::Display for LeakEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LEAK CHECK: {}: allocated object {:#x} with size {}",
            self.site, self.base, self.size
        )
    }
}

/// Allocation volume attributed to one site.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteTally {
    /// Bytes successfully allocated from this site.
    pub bytes: u64,
    /// Successful allocations from this site.
    pub count: u64,
}

/// A site responsible for a disproportionate share of allocated bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeavyHitter {
    pub site: Site,
    pub bytes: u64,
    pub count: u64,
    /// Share of all allocated bytes, in permille (rounded down).
    pub share_permille: u32,
}

impl fmt::Display for HeavyHitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HEAVY HITTER: {}: {} bytes (~{}.{}%)",
            self.site,
            self.bytes,
            self.share_permille / 10,
            self.share_permille % 10
        )
    }
}

/// Per-site allocation table, updated alongside the ledger.
///
/// Frees never reduce a site's tally: the report is about allocation
/// volume over the whole history, not about what is live.
#[derive(Debug, Default, Clone)]
pub struct HeavyHitterTable {
    sites: HashMap<Site, SiteTally>,
    total_bytes: u64,
}

impl HeavyHitterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account a successful allocation.
    pub fn observe(&mut self, site: Site, size: usize) {
        let size = size as u64;
        let tally = self.sites.entry(site).or_default();
        tally.bytes = tally.bytes.saturating_add(size);
        tally.count = tally.count.saturating_add(1);
        self.total_bytes = self.total_bytes.saturating_add(size);
    }

    #[must_use]
    pub fn tally(&self, site: Site) -> Option<SiteTally> {
        self.sites.get(&site).copied()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Sites at or above `threshold_permille` of total bytes, heaviest first.
    ///
    /// Nothing qualifies until some bytes have been allocated.
    #[must_use]
    pub fn report(&self, threshold_permille: u32) -> Vec<HeavyHitter> {
        if self.total_bytes == 0 {
            return Vec::new();
        }
        let total = u128::from(self.total_bytes);
        let mut hitters: Vec<HeavyHitter> = self
            .sites
            .iter()
            .filter(|(_, tally)| {
                u128::from(tally.bytes) * 1000 >= u128::from(threshold_permille) * total
            })
            .map(|(&site, tally)| HeavyHitter {
                site,
                bytes: tally.bytes,
                count: tally.count,
                share_permille: u32::try_from(u128::from(tally.bytes) * 1000 / total)
                    .unwrap_or(u32::MAX),
            })
            .collect();
        hitters.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.site.cmp(&b.site)));
        hitters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Site = Site::new("a.c", 1);
    const B: Site = Site::new("b.c", 2);
    const C: Site = Site::new("c.c", 3);

    #[test]
    fn leak_line_layout() {
        let entry = LeakEntry {
            site: A,
            base: 0x10,
            size: 7,
        };
        assert_eq!(
            entry.to_string(),
            "LEAK CHECK: a.c:1: allocated object 0x10 with size 7"
        );
    }

    #[test]
    fn heavy_hitters_are_sorted_and_thresholded() {
        let mut table = HeavyHitterTable::new();
        for _ in 0..3 {
            table.observe(A, 200);
        }
        table.observe(B, 350);
        table.observe(C, 50);
        assert_eq!(table.total_bytes(), 1000);
        assert_eq!(table.tally(A), Some(SiteTally { bytes: 600, count: 3 }));

        let hitters = table.report(200);
        assert_eq!(hitters.len(), 2);
        assert_eq!(hitters[0].site, A);
        assert_eq!(hitters[0].share_permille, 600);
        assert_eq!(hitters[1].site, B);
        assert_eq!(hitters[1].to_string(), "HEAVY HITTER: b.c:2: 350 bytes (~35.0%)");

        assert_eq!(table.report(0).len(), 3);
        assert!(table.report(1000).is_empty());
    }

    #[test]
    fn empty_table_reports_nothing() {
        let mut table = HeavyHitterTable::new();
        assert!(table.report(0).is_empty());
        table.observe(A, 0);
        assert!(table.report(0).is_empty());
    }

    #[test]
    fn ties_break_on_site_order() {
        let mut table = HeavyHitterTable::new();
        table.observe(B, 10);
        table.observe(A, 10);
        let sites: Vec<Site> = table.report(100).iter().map(|h| h.site).collect();
        assert_eq!(sites, vec![A, B]);
    }
}
