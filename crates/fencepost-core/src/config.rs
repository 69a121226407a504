//! Runtime configuration.
//!
//! Diagnostics go to stderr unless `FENCEPOST_DIAGNOSTICS` asks for silence:
//! - `stderr` (default): every violation line is written to stderr as it is
//!   detected, and also kept in the debugger's violation buffer.
//! - `silent`: violations are only kept in the buffer. Harnesses use this to
//!   capture output without scraping stderr.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where violation lines go besides the in-memory buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticsMode {
    /// Write each diagnostic line to stderr.
    #[default]
    Stderr,
    /// Buffer only.
    Silent,
}

impl DiagnosticsMode {
    /// Parse from string (case-insensitive). Unknown values fall back to the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "quiet" | "off" | "none" => Self::Silent,
            _ => Self::Stderr,
        }
    }

    #[must_use]
    pub const fn writes_stderr(self) -> bool {
        matches!(self, Self::Stderr)
    }
}

// Atomic cache: 0=unresolved, 1=Stderr, 2=Silent, 255=resolving.
static CACHED_MODE: AtomicU8 = AtomicU8::new(0);

const MODE_UNRESOLVED: u8 = 0;
const MODE_STDERR: u8 = 1;
const MODE_SILENT: u8 = 2;
const MODE_RESOLVING: u8 = 255;

fn mode_to_u8(mode: DiagnosticsMode) -> u8 {
    match mode {
        DiagnosticsMode::Stderr => MODE_STDERR,
        DiagnosticsMode::Silent => MODE_SILENT,
    }
}

fn u8_to_mode(v: u8) -> DiagnosticsMode {
    match v {
        MODE_SILENT => DiagnosticsMode::Silent,
        _ => DiagnosticsMode::Stderr,
    }
}

/// Process-wide diagnostics mode (reads the env var once, caches thereafter).
///
/// A call that lands while another is still resolving gets the default
/// instead of blocking.
#[must_use]
pub fn diagnostics_mode() -> DiagnosticsMode {
    let cached = CACHED_MODE.load(Ordering::Relaxed);
    if cached != MODE_UNRESOLVED && cached != MODE_RESOLVING {
        return u8_to_mode(cached);
    }
    if cached == MODE_RESOLVING {
        return DiagnosticsMode::default();
    }

    if CACHED_MODE
        .compare_exchange(
            MODE_UNRESOLVED,
            MODE_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_MODE.load(Ordering::Relaxed);
        return if v != MODE_UNRESOLVED && v != MODE_RESOLVING {
            u8_to_mode(v)
        } else {
            DiagnosticsMode::default()
        };
    }

    let mode = std::env::var("FENCEPOST_DIAGNOSTICS")
        .map(|v| DiagnosticsMode::from_str_loose(&v))
        .unwrap_or_default();
    CACHED_MODE.store(mode_to_u8(mode), Ordering::Release);
    mode
}

/// Share of all allocated bytes a site needs before it is a heavy hitter.
pub const DEFAULT_HEAVY_HITTER_PERMILLE: u32 = 200;

/// Lifecycle records retained before the oldest are evicted.
pub const DEFAULT_LIFECYCLE_CAPACITY: usize = 4096;

/// Violations buffered before the oldest are evicted.
pub const DEFAULT_VIOLATION_BUFFER_CAPACITY: usize = 4096;

/// Per-instance debugger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerConfig {
    /// Where violation lines are written.
    pub diagnostics: DiagnosticsMode,
    /// Heavy-hitter cutoff in permille of total allocated bytes.
    pub heavy_hitter_threshold_permille: u32,
    /// Lifecycle ring size; 0 disables lifecycle records.
    pub lifecycle_log_capacity: usize,
    /// Violations kept for `drain_violations`; 0 keeps none.
    pub violation_buffer_capacity: usize,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            diagnostics: DiagnosticsMode::default(),
            heavy_hitter_threshold_permille: DEFAULT_HEAVY_HITTER_PERMILLE,
            lifecycle_log_capacity: DEFAULT_LIFECYCLE_CAPACITY,
            violation_buffer_capacity: DEFAULT_VIOLATION_BUFFER_CAPACITY,
        }
    }
}

impl DebuggerConfig {
    /// Defaults with the diagnostics mode taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            diagnostics: diagnostics_mode(),
            ..Self::default()
        }
    }

    /// Defaults with diagnostics kept in the buffer only.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            diagnostics: DiagnosticsMode::Silent,
            ..Self::default()
        }
    }
}
