//! # fencepost-abi
//!
//! C boundary for the fencepost debugging allocator. Produces a `cdylib`
//! exporting `fencepost_malloc`, `fencepost_free` and friends, each taking
//! the caller's file and line. A C program routes its allocations through
//! them with a macro such as:
//!
//! ```text
//! #define malloc(sz) fencepost_malloc(sz, __FILE__, __LINE__)
//! ```
//!
//! The symbols do not shadow the system allocator, so they are safe to link
//! into test binaries.

mod debugger_state;
mod site_intern;

pub mod alloc_abi;

pub use alloc_abi::FencepostStatistics;
