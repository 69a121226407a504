//! Scenario execution engine.
//!
//! Each scenario runs against its own silent debugger so diagnostics are
//! captured from the violation buffer instead of stderr. Output lines are
//! collected in emission order and matched against the expected lines.

use std::collections::HashMap;
use std::ptr::{self, NonNull};
use std::time::Instant;

use fencepost_core::{
    CappedRaw, DebuggerConfig, LogLevel as CoreLevel, MemoryDebugger, Site, Statistics,
    SystemRaw, Violation, intern,
};
use serde::Serialize;

use crate::diff::render_diff;
use crate::error::HarnessError;
use crate::expect::lines_match;
use crate::fixtures::{Scenario, ScenarioSet, StatsExpectation, Step};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Result of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    /// Rendered mismatch, present only on failure.
    pub diff: Option<String>,
    /// Failed `assert_stats` checks.
    pub assertion_failures: Vec<String>,
    /// Violations detected while the scenario ran.
    pub violations: Vec<&'static str>,
    /// Lifecycle records at warn level or above.
    pub lifecycle_warnings: usize,
}

type Debugger = MemoryDebugger<CappedRaw<SystemRaw>>;

/// Runs scenarios and collects results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScenarioRunner;

impl ScenarioRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every scenario selected by `filter`.
    pub fn run_set(
        &self,
        set: &ScenarioSet,
        filter: Option<&str>,
    ) -> Result<Vec<ScenarioResult>, HarnessError> {
        let selected: Vec<&Scenario> = set.select(filter).collect();
        if selected.is_empty() {
            return Err(HarnessError::EmptySelection(
                filter.unwrap_or_default().to_string(),
            ));
        }
        selected.into_iter().map(|s| self.run(s)).collect()
    }

    /// Like [`run_set`](Self::run_set), writing start/end records for each
    /// scenario to `emitter`.
    pub fn run_set_logged(
        &self,
        set: &ScenarioSet,
        filter: Option<&str>,
        emitter: &mut LogEmitter,
    ) -> Result<Vec<ScenarioResult>, HarnessError> {
        let selected: Vec<&Scenario> = set.select(filter).collect();
        if selected.is_empty() {
            return Err(HarnessError::EmptySelection(
                filter.unwrap_or_default().to_string(),
            ));
        }
        let mut results = Vec::with_capacity(selected.len());
        for scenario in selected {
            emitter.emit_entry(
                LogEntry::new("", LogLevel::Info, "scenario_start")
                    .with_suite(&set.suite)
                    .with_scenario(&scenario.name),
            )?;
            let started = Instant::now();
            let outcome = self.run(scenario);
            let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            let entry = LogEntry::new("", LogLevel::Info, "scenario_end")
                .with_suite(&set.suite)
                .with_scenario(&scenario.name)
                .with_duration_us(elapsed);
            match outcome {
                Ok(result) => {
                    let (level, verdict) = if result.passed {
                        (LogLevel::Info, Outcome::Pass)
                    } else {
                        (LogLevel::Error, Outcome::Fail)
                    };
                    let mut entry = entry.with_outcome(verdict).with_details(serde_json::json!({
                        "output_lines": result.actual.len(),
                        "violations": result.violations,
                        "lifecycle_warnings": result.lifecycle_warnings,
                        "assertion_failures": result.assertion_failures,
                    }));
                    entry.level = level;
                    emitter.emit_entry(entry)?;
                    results.push(result);
                }
                Err(err) => {
                    let mut entry = entry
                        .with_outcome(Outcome::Error)
                        .with_details(serde_json::json!({ "error": err.to_string() }));
                    entry.level = LogLevel::Error;
                    emitter.emit_entry(entry)?;
                    return Err(err);
                }
            }
        }
        Ok(results)
    }

    /// Run one scenario against a fresh debugger.
    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioResult, HarnessError> {
        let file = intern(&scenario.file);
        let mut dbg: Debugger = MemoryDebugger::with_config(
            CappedRaw::new(SystemRaw, scenario.raw_cap),
            DebuggerConfig::silent(),
        );
        let mut exec = Execution {
            scenario,
            file,
            slots: HashMap::new(),
            output: Vec::new(),
            assertion_failures: Vec::new(),
            violations: Vec::new(),
        };

        let steps = scenario.steps.iter().enumerate();
        let outcome = steps
            .map(|(index, step)| exec.step(&mut dbg, index + 1, step))
            .collect::<Result<(), _>>();

        let lifecycle_warnings = dbg
            .lifecycle_logs()
            .filter(|r| r.level >= CoreLevel::Warn)
            .count();
        dbg.reset();
        outcome?;

        let matched = lines_match(scenario.expected.as_slice(), exec.output.as_slice());
        let passed = matched && exec.assertion_failures.is_empty();
        let diff = (!passed).then(|| {
            let mut text = render_diff(&scenario.expected, &exec.output);
            for failure in &exec.assertion_failures {
                text.push_str(&format!("! {failure}\n"));
            }
            text
        });

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            passed,
            expected: scenario.expected.clone(),
            actual: exec.output,
            diff,
            assertion_failures: exec.assertion_failures,
            violations: exec.violations,
            lifecycle_warnings,
        })
    }
}

struct Execution<'a> {
    scenario: &'a Scenario,
    file: &'static str,
    slots: HashMap<String, *mut u8>,
    output: Vec<String>,
    assertion_failures: Vec<String>,
    violations: Vec<&'static str>,
}

impl Execution<'_> {
    fn site(&self, number: usize, line: Option<u32>) -> Site {
        let line = line.unwrap_or_else(|| u32::try_from(number).unwrap_or(u32::MAX));
        Site::new(self.file, line)
    }

    fn slot(&self, number: usize, name: &str) -> Result<*mut u8, HarnessError> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::UnknownSlot {
                scenario: self.scenario.name.clone(),
                step: number,
                slot: name.to_string(),
            })
    }

    fn step(&mut self, dbg: &mut Debugger, number: usize, step: &Step) -> Result<(), HarnessError> {
        match step {
            Step::Malloc { slot, size, line } => {
                let ptr = dbg.malloc(*size, self.site(number, *line));
                self.slots
                    .insert(slot.clone(), ptr.map_or(ptr::null_mut(), NonNull::as_ptr));
            }
            Step::Calloc {
                slot,
                count,
                size,
                line,
            } => {
                let ptr = dbg.calloc(*count, *size, self.site(number, *line));
                self.slots
                    .insert(slot.clone(), ptr.map_or(ptr::null_mut(), NonNull::as_ptr));
            }
            Step::Realloc { slot, size, line } => {
                let old = self.slots.get(slot).copied().unwrap_or(ptr::null_mut());
                match dbg.realloc(old, *size, self.site(number, *line)) {
                    Some(ptr) => {
                        self.slots.insert(slot.clone(), ptr.as_ptr());
                    }
                    None if *size == 0 => {
                        self.slots.insert(slot.clone(), ptr::null_mut());
                    }
                    None => {}
                }
            }
            Step::Free { slot, offset, line } => {
                let ptr = self.slot(number, slot)?;
                dbg.free(ptr.wrapping_add(*offset), self.site(number, *line));
            }
            Step::FreeNull { line } => {
                dbg.free(ptr::null_mut(), self.site(number, *line));
            }
            Step::FreeForeign { line } => {
                let mut local = [0_u8; 16];
                dbg.free(local.as_mut_ptr(), self.site(number, *line));
            }
            Step::Write {
                slot,
                offset,
                len,
                byte,
            } => {
                let ptr = self.slot(number, slot)?;
                if !dbg.scribble(ptr, *offset, &vec![*byte; *len]) {
                    return Err(HarnessError::WriteOutOfReach {
                        scenario: self.scenario.name.clone(),
                        step: number,
                        slot: slot.clone(),
                        offset: *offset,
                        len: *len,
                    });
                }
            }
            Step::PrintStatistics => {
                let text = dbg.statistics().to_string();
                self.output.extend(text.lines().map(str::to_owned));
            }
            Step::LeakReport => {
                self.output
                    .extend(dbg.leak_report().iter().map(ToString::to_string));
            }
            Step::HeavyHitterReport => {
                self.output
                    .extend(dbg.heavy_hitters().iter().map(ToString::to_string));
            }
            Step::AssertStats(expected) => {
                let failures = check_stats(&dbg.statistics(), expected);
                self.assertion_failures
                    .extend(failures.into_iter().map(|f| format!("step {number}: {f}")));
            }
        }

        for violation in dbg.drain_violations() {
            self.violations.push(violation.label());
            self.output.extend(Violation::lines(&violation));
        }
        Ok(())
    }
}

fn check_stats(actual: &Statistics, expected: &StatsExpectation) -> Vec<String> {
    let counters = [
        ("active_count", expected.active_count, actual.active_count),
        ("active_bytes", expected.active_bytes, actual.active_bytes),
        ("total_count", expected.total_count, actual.total_count),
        ("total_bytes", expected.total_bytes, actual.total_bytes),
        ("fail_count", expected.fail_count, actual.fail_count),
        ("fail_bytes", expected.fail_bytes, actual.fail_bytes),
    ];
    let mut failures: Vec<String> = counters
        .into_iter()
        .filter_map(|(name, want, got)| {
            want.filter(|w| *w != got)
                .map(|w| format!("{name} expected {w} got {got}"))
        })
        .collect();
    if let Some(span) = expected.min_heap_span {
        let got = actual.heap_max.saturating_sub(actual.heap_min);
        if got < span {
            failures.push(format!("heap span expected at least {span} got {got}"));
        }
    }
    failures
}
