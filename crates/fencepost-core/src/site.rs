//! Call-site identity attached to allocation and release requests.

use std::collections::BTreeSet;
use std::fmt;

use parking_lot::{Mutex, const_mutex};
use serde::Serialize;

/// Source location of an allocating or releasing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Site {
    /// Source file name as reported by the caller.
    pub file: &'static str,
    /// Line number within `file`.
    pub line: u32,
}

impl Site {
    /// Placeholder for callers that cannot name their location.
    pub const UNKNOWN: Self = Self::new("?", 0);

    #[must_use]
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

static FILES: Mutex<BTreeSet<&'static str>> = const_mutex(BTreeSet::new());

/// Process-wide `&'static` copy of a file name.
///
/// Each distinct name is copied once and kept for the life of the process;
/// later calls with an equal name return the same reference.
pub fn intern(name: &str) -> &'static str {
    let mut files = FILES.lock();
    if let Some(&known) = files.get(name) {
        return known;
    }
    let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
    files.insert(leaked);
    leaked
}

/// Captures the invoking source location as a [`Site`].
#[macro_export]
macro_rules! site {
    () => {
        $crate::Site::new(file!(), line!())
    };
}
