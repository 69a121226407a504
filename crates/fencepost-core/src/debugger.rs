//! Debugging allocator facade.
//!
//! [`MemoryDebugger`] owns every piece of tracking state: ledger, freed set,
//! heap bounds, statistics, per-site tallies, violation buffer and lifecycle
//! log. Instances are independent, so tests can run several side by side.
//!
//! Release requests go through a fixed validation order, first match wins:
//! null, outside the heap bounds, already freed, live base (guard check then
//! release), interior of a live block, anything else.

use std::collections::VecDeque;
use std::ptr::NonNull;

use crate::bounds::BoundsTracker;
use crate::config::DebuggerConfig;
use crate::diagnostics::Violation;
use crate::guard::{self, GUARD_SIZE};
use crate::ledger::{AllocationLedger, AllocationRecord};
use crate::lifecycle::{LifecycleEvent, LifecycleLog, LifecycleRecord, LogLevel};
use crate::raw::{RawAllocator, SystemRaw};
use crate::report::{HeavyHitter, HeavyHitterTable, LeakEntry};
use crate::site::Site;
use crate::stats::Statistics;

/// What a release request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeOutcome {
    /// Null pointer; nothing happened.
    Null,
    /// Block validated and handed back to the raw adapter.
    Released,
    /// Block handed back, but its guard region had been overwritten.
    ReleasedWithCorruption(Violation),
    /// Request refused; no state changed.
    Rejected(Violation),
}

impl FreeOutcome {
    /// True when the block was returned to the raw adapter.
    #[must_use]
    pub const fn released(&self) -> bool {
        matches!(self, Self::Released | Self::ReleasedWithCorruption(_))
    }

    /// Outcome for a release that hit `violation`.
    #[must_use]
    pub fn from_violation(violation: Violation) -> Self {
        if violation.aborts_release() {
            Self::Rejected(violation)
        } else {
            Self::ReleasedWithCorruption(violation)
        }
    }

    #[must_use]
    pub const fn violation(&self) -> Option<&Violation> {
        match self {
            Self::ReleasedWithCorruption(v) | Self::Rejected(v) => Some(v),
            Self::Null | Self::Released => None,
        }
    }
}

/// Allocation tracker and free validator in front of a raw allocator.
#[derive(Debug)]
pub struct MemoryDebugger<A: RawAllocator = SystemRaw> {
    raw: A,
    config: DebuggerConfig,
    ledger: AllocationLedger,
    bounds: BoundsTracker,
    stats: Statistics,
    hitters: HeavyHitterTable,
    violations: VecDeque<Violation>,
    lifecycle: LifecycleLog,
}

impl MemoryDebugger<SystemRaw> {
    /// Debugger over the C heap, configured from the environment.
    #[must_use]
    pub fn system() -> Self {
        Self::with_config(SystemRaw, DebuggerConfig::from_env())
    }
}

impl<A: RawAllocator> MemoryDebugger<A> {
    /// Debugger over `raw` with default configuration.
    #[must_use]
    pub fn new(raw: A) -> Self {
        Self::with_config(raw, DebuggerConfig::default())
    }

    #[must_use]
    pub fn with_config(raw: A, config: DebuggerConfig) -> Self {
        Self {
            raw,
            config,
            ledger: AllocationLedger::new(),
            bounds: BoundsTracker::new(),
            stats: Statistics::default(),
            hitters: HeavyHitterTable::new(),
            violations: VecDeque::new(),
            lifecycle: LifecycleLog::new(config.lifecycle_log_capacity),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// The wrapped raw adapter.
    #[must_use]
    pub fn raw(&self) -> &A {
        &self.raw
    }

    fn note(&mut self, event: LifecycleEvent) {
        self.lifecycle
            .record(event, self.stats.active_count, self.stats.active_bytes);
    }

    fn emit(&mut self, violation: &Violation) {
        if self.config.diagnostics.writes_stderr() {
            eprintln!("{violation}");
        }
        let capacity = self.config.violation_buffer_capacity;
        if capacity == 0 {
            return;
        }
        if self.violations.len() == capacity {
            self.violations.pop_front();
        }
        self.violations.push_back(violation.clone());
    }

    /// Allocate `size` user bytes followed by a guard region.
    ///
    /// Zero-byte requests still get a unique base. Returns `None` when the
    /// internal size overflows or the raw adapter is exhausted; both count
    /// as failures of `size` bytes.
    pub fn malloc(&mut self, size: usize, site: Site) -> Option<NonNull<u8>> {
        let Some(internal) = guard::internal_size(size) else {
            self.stats.record_failure(size as u64);
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "malloc", "alloc", "overflow")
                    .size(size)
                    .details(format!("site={site} guard={GUARD_SIZE}")),
            );
            return None;
        };

        let Some(base) = self.raw.allocate(internal) else {
            self.stats.record_failure(size as u64);
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "malloc", "alloc", "oom")
                    .size(size)
                    .details(format!("site={site} internal={internal}")),
            );
            return None;
        };

        // SAFETY: the adapter returned `internal` bytes, which is at least
        // `size + GUARD_SIZE`.
        unsafe { guard::write_guard(base, size) };

        let addr = base.as_ptr() as usize;
        self.ledger.insert(addr, AllocationRecord { size, site });
        self.bounds.observe(addr, size);
        self.stats.record_success(size);
        self.hitters.observe(site, size);
        self.note(
            LifecycleEvent::new(LogLevel::Trace, "malloc", "alloc", "success")
                .ptr(addr)
                .size(size)
                .details(format!("site={site}")),
        );
        Some(base)
    }

    /// Validate and release `ptr`.
    ///
    /// Invalid requests are reported and leave every counter untouched. A
    /// damaged guard region is reported but the block is released anyway.
    pub fn free(&mut self, ptr: *mut u8, site: Site) -> FreeOutcome {
        let Some(base) = NonNull::new(ptr) else {
            self.note(
                LifecycleEvent::new(LogLevel::Trace, "free", "free_null", "noop")
                    .details(format!("site={site}")),
            );
            return FreeOutcome::Null;
        };
        let addr = ptr as usize;

        if !self.bounds.contains(addr) {
            return self.reject(Violation::NotInHeap { site, addr });
        }
        if self.ledger.was_freed(addr) {
            return self.reject(Violation::DoubleFree { site, addr });
        }
        if let Some(&record) = self.ledger.get(addr) {
            return self.release_live(base, record, site);
        }
        if let Some(hit) = self.ledger.containing(addr) {
            return self.reject(Violation::InteriorFree {
                site,
                addr,
                owner: hit.record.site,
                base: hit.base,
                offset: hit.offset,
                size: hit.record.size,
            });
        }
        self.reject(Violation::UnknownFree { site, addr })
    }

    fn reject(&mut self, violation: Violation) -> FreeOutcome {
        self.emit(&violation);
        self.note(
            LifecycleEvent::new(LogLevel::Warn, "free", violation.label(), "rejected")
                .ptr(violation.addr())
                .details(format!("site={}", violation.site())),
        );
        FreeOutcome::from_violation(violation)
    }

    fn release_live(
        &mut self,
        base: NonNull<u8>,
        record: AllocationRecord,
        site: Site,
    ) -> FreeOutcome {
        let addr = base.as_ptr() as usize;

        // SAFETY: `addr` is a live ledger base, so the adapter handed us at
        // least `record.size + GUARD_SIZE` bytes there and has not had them back.
        let corrupt = unsafe { guard::first_corrupt_byte(base, record.size) };
        let wild = corrupt.map(|first_corrupt| Violation::WildWrite {
            site,
            addr,
            size: record.size,
            first_corrupt,
        });
        if let Some(violation) = &wild {
            self.emit(violation);
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "free", violation.label(), "detected")
                    .ptr(addr)
                    .size(record.size)
                    .details(format!(
                        "site={site} allocated_at={} first_corrupt={}",
                        record.site,
                        corrupt.unwrap_or_default()
                    )),
            );
        }

        let underflow = self.stats.record_release(record.size);
        if underflow.count {
            self.note(
                LifecycleEvent::new(
                    LogLevel::Error,
                    "free",
                    "invariant_active_count_underflow",
                    "recovered",
                )
                .ptr(addr)
                .size(record.size),
            );
        }
        if underflow.bytes {
            self.note(
                LifecycleEvent::new(
                    LogLevel::Error,
                    "free",
                    "invariant_active_bytes_underflow",
                    "recovered",
                )
                .ptr(addr)
                .size(record.size),
            );
        }

        self.ledger.retire(addr);
        // SAFETY: `base` came from this adapter and its metadata is already
        // gone, so nothing can reach it through the ledger any more.
        unsafe { self.raw.release(base) };

        self.note(
            LifecycleEvent::new(LogLevel::Trace, "free", "free", "success")
                .ptr(addr)
                .size(record.size)
                .details(format!("site={site} allocated_at={}", record.site)),
        );
        wild.map_or(FreeOutcome::Released, FreeOutcome::from_violation)
    }

    /// Allocate `count * size` zeroed bytes.
    ///
    /// A product that overflows fails without touching the raw adapter; the
    /// failure is counted with the intended byte total, saturated to `u64`.
    pub fn calloc(&mut self, count: usize, size: usize, site: Site) -> Option<NonNull<u8>> {
        let Some(total) = count.checked_mul(size) else {
            let intended = (count as u128).saturating_mul(size as u128);
            self.stats
                .record_failure(u64::try_from(intended).unwrap_or(u64::MAX));
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "calloc", "calloc_overflow", "denied")
                    .details(format!("site={site} count={count} size={size}")),
            );
            return None;
        };

        let ptr = self.malloc(total, site)?;
        // SAFETY: `ptr` is a fresh block of `total` user bytes.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, total) };
        Some(ptr)
    }

    /// Resize a block by allocating, copying, and releasing the old one.
    ///
    /// Null behaves like `malloc`; a zero size behaves like `free` and
    /// returns `None`. A pointer that is not a live base is run through the
    /// release validation for its diagnostic and nothing is allocated. If
    /// the new allocation fails the old block stays live.
    pub fn realloc(&mut self, ptr: *mut u8, size: usize, site: Site) -> Option<NonNull<u8>> {
        if ptr.is_null() {
            return self.malloc(size, site);
        }
        if size == 0 {
            self.free(ptr, site);
            return None;
        }

        let Some(&old) = self.ledger.get(ptr as usize) else {
            let outcome = self.free(ptr, site);
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "realloc", "realloc_invalid_pointer", "denied")
                    .ptr(ptr as usize)
                    .size(size)
                    .details(format!("free_outcome_released={}", outcome.released())),
            );
            return None;
        };

        let Some(fresh) = self.malloc(size, site) else {
            self.note(
                LifecycleEvent::new(LogLevel::Warn, "realloc", "realloc_allocate_new_failed", "oom")
                    .ptr(ptr as usize)
                    .size(size),
            );
            return None;
        };

        // SAFETY: both blocks are live and distinct; the copy length fits
        // inside each user region.
        unsafe { std::ptr::copy_nonoverlapping(ptr, fresh.as_ptr(), old.size.min(size)) };
        self.free(ptr, site);
        self.note(
            LifecycleEvent::new(LogLevel::Trace, "realloc", "realloc_move", "success")
                .ptr(fresh.as_ptr() as usize)
                .size(size)
                .details(format!("old_ptr={:#x} old_size={}", ptr as usize, old.size)),
        );
        Some(fresh)
    }

    /// Copy of the current counters, with heap bounds filled in.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let mut stats = self.stats;
        if let Some(bounds) = self.bounds.get() {
            stats.heap_min = bounds.min;
            stats.heap_max = bounds.max;
        }
        stats
    }

    /// Every live block, in ascending base order.
    #[must_use]
    pub fn leak_report(&self) -> Vec<LeakEntry> {
        self.ledger
            .iter()
            .map(|(base, record)| LeakEntry {
                site: record.site,
                base,
                size: record.size,
            })
            .collect()
    }

    /// Heavy hitters at the configured threshold.
    #[must_use]
    pub fn heavy_hitters(&self) -> Vec<HeavyHitter> {
        self.hitters
            .report(self.config.heavy_hitter_threshold_permille)
    }

    /// Heavy hitters at an explicit threshold.
    #[must_use]
    pub fn heavy_hitters_above(&self, threshold_permille: u32) -> Vec<HeavyHitter> {
        self.hitters.report(threshold_permille)
    }

    /// Metadata for the live block based at `ptr`.
    #[must_use]
    pub fn lookup(&self, ptr: *const u8) -> Option<AllocationRecord> {
        self.ledger.get(ptr as usize).copied()
    }

    /// Copy of the user region of the live block based at `ptr`.
    #[must_use]
    pub fn contents(&self, ptr: *const u8) -> Option<Vec<u8>> {
        let record = self.ledger.get(ptr as usize)?;
        // SAFETY: live base with `record.size` readable user bytes.
        let bytes = unsafe { std::slice::from_raw_parts(ptr, record.size) };
        Some(bytes.to_vec())
    }

    /// Overwrite bytes of the live block based at `ptr`, starting `offset`
    /// bytes in. The write may run into the guard region but not past it.
    ///
    /// Returns false, writing nothing, when `ptr` is not a live base or the
    /// range does not fit. Used to inject overruns in tests and fixtures.
    pub fn scribble(&mut self, ptr: *mut u8, offset: usize, bytes: &[u8]) -> bool {
        let Some(record) = self.ledger.get(ptr as usize) else {
            return false;
        };
        let reach = record.size.max(1) + GUARD_SIZE;
        let fits = offset
            .checked_add(bytes.len())
            .is_some_and(|end| end <= reach);
        if !fits {
            return false;
        }
        // SAFETY: `ptr` is a live base whose raw allocation covers `reach`
        // bytes, and `offset + bytes.len()` stays inside it.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.add(offset), bytes.len()) };
        true
    }

    /// True when `ptr` was released and not handed out again since.
    #[must_use]
    pub fn is_freed(&self, ptr: *const u8) -> bool {
        self.ledger.was_freed(ptr as usize)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.ledger.len()
    }

    /// Sum of live user sizes recomputed from the ledger.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.ledger.live_bytes()
    }

    /// Violations detected since the last drain, oldest first. Only the
    /// newest `violation_buffer_capacity` are retained.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter()
    }

    pub fn drain_violations(&mut self) -> Vec<Violation> {
        self.violations.drain(..).collect()
    }

    pub fn lifecycle_logs(&self) -> impl Iterator<Item = &LifecycleRecord> + '_ {
        self.lifecycle.records()
    }

    pub fn drain_lifecycle_logs(&mut self) -> Vec<LifecycleRecord> {
        self.lifecycle.drain()
    }

    /// Release every live block and start over with zeroed state.
    pub fn reset(&mut self) {
        let live = self.ledger.take_live();
        let released = live.len();
        for base in live.into_keys() {
            if let Some(ptr) = NonNull::new(base as *mut u8) {
                // SAFETY: every ledger base came from this adapter and is
                // still outstanding.
                unsafe { self.raw.release(ptr) };
            }
        }
        self.bounds = BoundsTracker::new();
        self.stats = Statistics::default();
        self.hitters = HeavyHitterTable::new();
        self.violations.clear();
        self.lifecycle.clear();
        self.note(
            LifecycleEvent::new(LogLevel::Info, "reset", "reset", "success")
                .details(format!("released={released}")),
        );
    }
}
