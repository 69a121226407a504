//! Structured lifecycle log.
//!
//! Every entry point leaves a record of what it decided, tagged with a
//! monotonic decision id and a snapshot of the live counters. The log is a
//! bounded ring so a long-running process cannot grow it without limit.

use std::collections::VecDeque;

use serde::Serialize;

/// Lifecycle record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One entry-point decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRecord {
    /// Monotonic decision id.
    pub decision_id: u64,
    /// Correlation id (`fencepost::<symbol>::<id>`).
    pub trace_id: String,
    pub level: LogLevel,
    /// Entry point (`malloc`, `free`, `calloc`, `realloc`, `reset`).
    pub symbol: &'static str,
    /// Event kind (`alloc`, `free`, `double_free`, ...).
    pub event: &'static str,
    /// Pointer involved, if any.
    pub ptr: Option<usize>,
    /// Size involved, if any.
    pub size: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details.
    pub details: String,
    /// Snapshot: live block count.
    pub active_count: u64,
    /// Snapshot: live user bytes.
    pub active_bytes: u64,
}

/// Record contents supplied by the caller; ids and snapshots are filled in.
#[derive(Debug, Clone)]
pub(crate) struct LifecycleEvent {
    level: LogLevel,
    symbol: &'static str,
    event: &'static str,
    outcome: &'static str,
    ptr: Option<usize>,
    size: Option<usize>,
    details: String,
}

impl LifecycleEvent {
    pub(crate) fn new(
        level: LogLevel,
        symbol: &'static str,
        event: &'static str,
        outcome: &'static str,
    ) -> Self {
        Self {
            level,
            symbol,
            event,
            outcome,
            ptr: None,
            size: None,
            details: String::new(),
        }
    }

    pub(crate) fn ptr(mut self, ptr: usize) -> Self {
        self.ptr = Some(ptr);
        self
    }

    pub(crate) fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub(crate) fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Bounded ring of lifecycle records.
#[derive(Debug, Clone)]
pub struct LifecycleLog {
    records: VecDeque<LifecycleRecord>,
    capacity: usize,
    next_decision_id: u64,
}

impl LifecycleLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
            next_decision_id: 1,
        }
    }

    pub(crate) fn record(&mut self, event: LifecycleEvent, active_count: u64, active_bytes: u64) {
        if self.capacity == 0 {
            return;
        }
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(LifecycleRecord {
            decision_id,
            trace_id: format!("fencepost::{}::{:016x}", event.symbol, decision_id),
            level: event.level,
            symbol: event.symbol,
            event: event.event,
            ptr: event.ptr,
            size: event.size,
            outcome: event.outcome,
            details: event.details,
            active_count,
            active_bytes,
        });
    }

    /// Records currently retained, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &LifecycleRecord> + '_ {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take every retained record.
    pub fn drain(&mut self) -> Vec<LifecycleRecord> {
        self.records.drain(..).collect()
    }

    /// Drop all records; decision ids keep counting.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
