//! Scenario harness for the fencepost debugging allocator.
//!
//! This crate provides:
//! - Fixtures: JSON scenario sets, each a list of allocator steps plus the
//!   output lines they should produce
//! - Matching: expected output with `???` wildcards
//! - Runner: executes scenarios against an isolated debugger
//! - Structured logs: JSONL records per scenario, pinned to a fixture digest

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod runner;
pub mod structured_log;

pub use error::HarnessError;
pub use fixtures::{Scenario, ScenarioSet, StatsExpectation, Step};
pub use runner::{ScenarioResult, ScenarioRunner};
