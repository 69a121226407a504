//! Trailing guard region.
//!
//! Every block is followed by `GUARD_SIZE` bytes of `GUARD_BYTE`. Any other
//! value found there at release time means something wrote past the end of
//! the user region.

use std::ptr::NonNull;

/// Bytes of sentinel appended after each user region.
pub const GUARD_SIZE: usize = 16;

/// Sentinel value filling the guard region.
pub const GUARD_BYTE: u8 = 0xA5;

/// Size to request from the raw adapter for a `requested`-byte block.
///
/// Zero-byte requests still occupy one byte so every block has a distinct
/// base. `None` when the sum does not fit in `usize`.
#[must_use]
pub const fn internal_size(requested: usize) -> Option<usize> {
    let body = if requested == 0 { 1 } else { requested };
    body.checked_add(GUARD_SIZE)
}

/// Fill the guard region that follows a `user_size`-byte region at `base`.
///
/// # Safety
///
/// `base` must be valid for writes of `user_size + GUARD_SIZE` bytes.
pub unsafe fn write_guard(base: NonNull<u8>, user_size: usize) {
    // SAFETY: the caller vouches for `user_size + GUARD_SIZE` writable bytes.
    unsafe { std::ptr::write_bytes(base.as_ptr().add(user_size), GUARD_BYTE, GUARD_SIZE) };
}

/// Offset within the guard region of the first byte that lost its sentinel.
///
/// # Safety
///
/// `base` must be valid for reads of `user_size + GUARD_SIZE` bytes.
#[must_use]
pub unsafe fn first_corrupt_byte(base: NonNull<u8>, user_size: usize) -> Option<usize> {
    // SAFETY: the caller vouches for `user_size + GUARD_SIZE` readable bytes.
    let guard = unsafe { std::slice::from_raw_parts(base.as_ptr().add(user_size), GUARD_SIZE) };
    guard.iter().position(|&byte| byte != GUARD_BYTE)
}
