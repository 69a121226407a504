//! Call-site conversion for C callers.
//!
//! C passes `__FILE__` as a transient pointer; the ledger wants a
//! `&'static str`, so names go through the process-wide interner.

use std::ffi::{CStr, c_char, c_long};

use fencepost_core::{Site, intern};

/// Build a [`Site`] from a C file name and line.
///
/// A null file becomes `?`; a line outside `u32` becomes 0.
///
/// # Safety
///
/// `file` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn site_from_c(file: *const c_char, line: c_long) -> Site {
    let line = u32::try_from(line).unwrap_or(0);
    if file.is_null() {
        return Site::new(Site::UNKNOWN.file, line);
    }
    // SAFETY: caller guarantees a NUL-terminated string.
    let name = unsafe { CStr::from_ptr(file) }.to_string_lossy();
    Site::new(intern(&name), line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_file_renders_as_question_mark() {
        // SAFETY: null is allowed.
        let site = unsafe { site_from_c(std::ptr::null(), 17) };
        assert_eq!(site.to_string(), "?:17");
    }

    #[test]
    fn same_name_interns_once() {
        let a = c"intern_same.c".to_owned();
        let b = c"intern_same.c".to_owned();
        // SAFETY: both are NUL-terminated.
        let (sa, sb) = unsafe { (site_from_c(a.as_ptr(), 1), site_from_c(b.as_ptr(), 2)) };
        assert!(std::ptr::eq(sa.file, sb.file));
        assert_eq!(sa.file, "intern_same.c");
        assert!(std::ptr::eq(sa.file, intern("intern_same.c")));
    }

    #[test]
    fn negative_line_becomes_zero() {
        // SAFETY: null is allowed.
        let site = unsafe { site_from_c(std::ptr::null(), -4) };
        assert_eq!(site.line, 0);
    }
}
