//! `extern "C"` allocation entry points.
//!
//! Each call carries the caller's `__FILE__`/`__LINE__` so diagnostics and
//! reports can name where a block came from. Violations are reported through
//! the debugger's diagnostic channel; the C caller only sees a null return
//! or a no-op.

use std::ffi::{c_char, c_long, c_void};
use std::io::Write;

use fencepost_core::Statistics;

use crate::debugger_state::{self, with_debugger};
use crate::site_intern::site_from_c;

/// C view of [`Statistics`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FencepostStatistics {
    pub active_count: u64,
    pub active_bytes: u64,
    pub total_count: u64,
    pub total_bytes: u64,
    pub fail_count: u64,
    pub fail_bytes: u64,
    pub heap_min: usize,
    pub heap_max: usize,
}

impl From<Statistics> for FencepostStatistics {
    fn from(stats: Statistics) -> Self {
        Self {
            active_count: stats.active_count,
            active_bytes: stats.active_bytes,
            total_count: stats.total_count,
            total_bytes: stats.total_bytes,
            fail_count: stats.fail_count,
            fail_bytes: stats.fail_bytes,
            heap_min: stats.heap_min,
            heap_max: stats.heap_max,
        }
    }
}

/// Allocate `size` bytes. Returns null on failure.
///
/// # Safety
///
/// `file` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fencepost_malloc(
    size: usize,
    file: *const c_char,
    line: c_long,
) -> *mut c_void {
    // SAFETY: forwarded under the caller's contract.
    let site = unsafe { site_from_c(file, line) };
    with_debugger(|dbg| dbg.malloc(size, site))
        .map_or(std::ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

/// Release `ptr`. Invalid pointers are reported and otherwise ignored.
///
/// # Safety
///
/// `file` must be null or a NUL-terminated string. A live `ptr` must not be
/// used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fencepost_free(ptr: *mut c_void, file: *const c_char, line: c_long) {
    // SAFETY: forwarded under the caller's contract.
    let site = unsafe { site_from_c(file, line) };
    with_debugger(|dbg| {
        dbg.free(ptr.cast(), site);
    });
}

/// Allocate `count * size` zeroed bytes. Returns null on overflow or failure.
///
/// # Safety
///
/// `file` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fencepost_calloc(
    count: usize,
    size: usize,
    file: *const c_char,
    line: c_long,
) -> *mut c_void {
    // SAFETY: forwarded under the caller's contract.
    let site = unsafe { site_from_c(file, line) };
    with_debugger(|dbg| dbg.calloc(count, size, site))
        .map_or(std::ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

/// Resize `ptr` to `size` bytes, moving its contents.
///
/// # Safety
///
/// `file` must be null or a NUL-terminated string. On a non-null return the
/// old `ptr` must not be used again.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fencepost_realloc(
    ptr: *mut c_void,
    size: usize,
    file: *const c_char,
    line: c_long,
) -> *mut c_void {
    // SAFETY: forwarded under the caller's contract.
    let site = unsafe { site_from_c(file, line) };
    with_debugger(|dbg| dbg.realloc(ptr.cast(), size, site))
        .map_or(std::ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

/// Copy the current statistics into `out`. Null `out` is ignored.
///
/// # Safety
///
/// `out` must be null or valid for a write of `FencepostStatistics`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fencepost_get_statistics(out: *mut FencepostStatistics) {
    if out.is_null() {
        return;
    }
    let stats = with_debugger(|dbg| dbg.statistics());
    // SAFETY: `out` is non-null and the caller guarantees it is writable.
    unsafe { out.write(stats.into()) };
}

fn print_lines(lines: impl IntoIterator<Item = String>) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        // Nothing useful to do with a closed stdout.
        let _ = writeln!(out, "{line}");
    }
    let _ = out.flush();
}

/// Print the two-line statistics report to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn fencepost_print_statistics() {
    let text = with_debugger(|dbg| dbg.statistics().to_string());
    print_lines(text.lines().map(str::to_owned));
}

/// Print one `LEAK CHECK` line per live block to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn fencepost_print_leak_report() {
    let lines = with_debugger(|dbg| {
        dbg.leak_report()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    });
    print_lines(lines);
}

/// Print one `HEAVY HITTER` line per qualifying call site to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn fencepost_print_heavy_hitter_report() {
    let lines = with_debugger(|dbg| {
        dbg.heavy_hitters()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    });
    print_lines(lines);
}

/// Release every live block and zero all tracking state.
#[unsafe(no_mangle)]
pub extern "C" fn fencepost_reset() {
    debugger_state::reset();
}
