//! # fencepost-core
//!
//! Debugging allocator engine. Wraps a raw allocator and tracks every block
//! it hands out so that the release path can tell a good pointer from a bad
//! one: outside the heap, double release, interior pointer, unknown address.
//! Each block carries a trailing guard region that is checked on release to
//! catch writes past the end.
//!
//! Also kept: aggregate statistics, heap bounds, a leak report of
//! everything still live, and per-call-site byte tallies for heavy-hitter
//! reporting.

pub mod bounds;
pub mod config;
pub mod debugger;
pub mod diagnostics;
pub mod guard;
pub mod ledger;
pub mod lifecycle;
pub mod raw;
pub mod report;
pub mod site;
pub mod stats;

pub use bounds::{BoundsTracker, HeapBounds};
pub use config::{DebuggerConfig, DiagnosticsMode, diagnostics_mode};
pub use debugger::{FreeOutcome, MemoryDebugger};
pub use diagnostics::Violation;
pub use guard::{GUARD_BYTE, GUARD_SIZE};
pub use ledger::{AllocationLedger, AllocationRecord, Containing};
pub use lifecycle::{LifecycleLog, LifecycleRecord, LogLevel};
pub use raw::{CappedRaw, RawAllocator, SystemRaw};
pub use report::{HeavyHitter, HeavyHitterTable, LeakEntry, SiteTally};
pub use site::{Site, intern};
pub use stats::Statistics;
