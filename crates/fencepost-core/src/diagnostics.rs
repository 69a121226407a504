//! Memory-safety violations and their textual diagnostic form.
//!
//! `Display` renders the exact lines written to the diagnostic channel, so
//! fixtures matching on stderr text and code matching on variants see the
//! same thing.

use serde::Serialize;
use thiserror::Error;

use crate::site::Site;

/// A violation detected on the release path.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Address lies outside every byte ever handed out.
    #[error("MEMORY BUG: {site}: invalid free of pointer {addr:#x}, not in heap")]
    NotInHeap { site: Site, addr: usize },

    /// Address was already released and not reused since.
    #[error("MEMORY BUG: {site}: invalid free of pointer {addr:#x}, double free")]
    DoubleFree { site: Site, addr: usize },

    /// Address points inside a live block rather than at its base.
    #[error(
        "MEMORY BUG: {site}: invalid free of pointer {addr:#x}, not allocated\n  \
         {owner}: {addr:#x} is {offset} bytes inside a {size} byte region allocated here"
    )]
    InteriorFree {
        site: Site,
        addr: usize,
        owner: Site,
        base: usize,
        offset: usize,
        size: usize,
    },

    /// Address is inside the heap bounds but belongs to no live block.
    #[error("MEMORY BUG: {site}: invalid free of pointer {addr:#x}, not allocated")]
    UnknownFree { site: Site, addr: usize },

    /// The guard region after a block was overwritten. The release still
    /// completes; the line carries no call site.
    #[error("MEMORY BUG: detected wild write during free of pointer {addr:#x}")]
    WildWrite {
        site: Site,
        addr: usize,
        size: usize,
        first_corrupt: usize,
    },
}

impl Violation {
    /// The pointer passed to the offending call.
    #[must_use]
    pub const fn addr(&self) -> usize {
        match self {
            Self::NotInHeap { addr, .. }
            | Self::DoubleFree { addr, .. }
            | Self::InteriorFree { addr, .. }
            | Self::UnknownFree { addr, .. }
            | Self::WildWrite { addr, .. } => *addr,
        }
    }

    /// The call site of the offending call.
    #[must_use]
    pub const fn site(&self) -> Site {
        match self {
            Self::NotInHeap { site, .. }
            | Self::DoubleFree { site, .. }
            | Self::InteriorFree { site, .. }
            | Self::UnknownFree { site, .. }
            | Self::WildWrite { site, .. } => *site,
        }
    }

    /// Whether the violation stops the release from happening.
    #[must_use]
    pub const fn aborts_release(&self) -> bool {
        !matches!(self, Self::WildWrite { .. })
    }

    /// Stable machine-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotInHeap { .. } => "invalid_free_not_in_heap",
            Self::DoubleFree { .. } => "double_free",
            Self::InteriorFree { .. } => "invalid_free_interior",
            Self::UnknownFree { .. } => "invalid_free_not_allocated",
            Self::WildWrite { .. } => "wild_write",
        }
    }

    /// Diagnostic lines in emission order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.to_string().lines().map(str::to_owned).collect()
    }
}
