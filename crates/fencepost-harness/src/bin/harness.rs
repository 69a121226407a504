//! CLI entrypoint for the fencepost scenario harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fencepost_harness::ScenarioRunner;
use fencepost_harness::ScenarioSet;
use fencepost_harness::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, sha256_hex};

/// Scenario tooling for fencepost.
#[derive(Debug, Parser)]
#[command(name = "fencepost-harness")]
#[command(about = "Run allocator debugging scenarios against expected output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run scenarios and compare their output.
    Run {
        /// Scenario fixture JSON path.
        #[arg(long)]
        fixture: PathBuf,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Only run scenarios whose name contains this substring.
        #[arg(long)]
        filter: Option<String>,
    },
    /// List the scenarios in a fixture.
    List {
        /// Scenario fixture JSON path.
        #[arg(long)]
        fixture: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            fixture,
            log,
            filter,
        } => {
            let bytes = std::fs::read(&fixture)?;
            let digest = sha256_hex(&bytes);
            let set = ScenarioSet::from_json(std::str::from_utf8(&bytes)?)?;
            eprintln!(
                "Running suite {} ({} scenarios) from {}",
                set.suite,
                set.scenarios.len(),
                fixture.display()
            );

            let runner = ScenarioRunner::new();
            let results = match log {
                Some(path) => {
                    let run_id = format!("run-{}", std::process::id());
                    let mut emitter = LogEmitter::to_file(&path, &run_id)?;
                    let results =
                        runner.run_set_logged(&set, filter.as_deref(), &mut emitter)?;
                    let failed = results.iter().filter(|r| !r.passed).count();
                    let summary = LogEntry::new("", LogLevel::Info, "run_summary")
                        .with_suite(&set.suite)
                        .with_outcome(if failed == 0 { Outcome::Pass } else { Outcome::Fail })
                        .with_details(serde_json::json!({
                            "fixture": fixture.display().to_string(),
                            "fixture_sha256": digest,
                            "scenarios": results.len(),
                            "failed": failed,
                        }));
                    emitter.emit_entry(summary)?;
                    emitter.flush()?;
                    results
                }
                None => runner.run_set(&set, filter.as_deref())?,
            };

            let mut failed = 0usize;
            for result in &results {
                if result.passed {
                    println!("PASS {}", result.name);
                } else {
                    failed += 1;
                    println!("FAIL {}", result.name);
                    if let Some(diff) = &result.diff {
                        print!("{diff}");
                    }
                }
            }
            println!(
                "{} passed, {} failed (fixture sha256 {digest})",
                results.len() - failed,
                failed
            );
            if failed > 0 {
                std::process::exit(1);
            }
        }
        Command::List { fixture } => {
            let set = ScenarioSet::from_file(&fixture)?;
            for scenario in &set.scenarios {
                if scenario.description.is_empty() {
                    println!("{}", scenario.name);
                } else {
                    println!("{}: {}", scenario.name, scenario.description);
                }
            }
        }
    }

    Ok(())
}
