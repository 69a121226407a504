//! Process-wide debugger behind the C entry points.
//!
//! Built on first use, torn down only by an explicit reset, never on exit.
//! Every entry point takes the lock for its whole duration, so the
//! debugger's single-writer contract holds under concurrent callers.

use fencepost_core::{DebuggerConfig, MemoryDebugger, SystemRaw};
use parking_lot::{Mutex, const_mutex};

static DEBUGGER: Mutex<Option<MemoryDebugger<SystemRaw>>> = const_mutex(None);

/// Run `f` against the global debugger, creating it if needed.
pub(crate) fn with_debugger<R>(f: impl FnOnce(&mut MemoryDebugger<SystemRaw>) -> R) -> R {
    let mut guard = DEBUGGER.lock();
    let debugger =
        guard.get_or_insert_with(|| MemoryDebugger::with_config(SystemRaw, DebuggerConfig::from_env()));
    f(debugger)
}

/// Release every live block and drop all tracking state.
pub(crate) fn reset() {
    let mut guard = DEBUGGER.lock();
    if let Some(debugger) = guard.as_mut() {
        debugger.reset();
    }
}
