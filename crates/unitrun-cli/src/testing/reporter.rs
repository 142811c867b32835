//! Test reporter - display test results

use crate::testing::result::{tail_lines, FileRun, Outcome, RunSummary, TestCase};
use colored::*;
use serde_json::{json, Value};
use std::io::{self, Write};

/// Lines of captured stderr shown under a failing file
const STDERR_TAIL: usize = 10;

/// Test reporter with output configuration
pub struct TestReporter {
    /// Show one line per case instead of progress characters
    verbose: bool,
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TestReporter {
    /// Create a new test reporter
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print progress for a file that just finished
    pub fn file_finished(&self, run: &FileRun) {
        for case in &run.cases {
            self.print_case(run, case);
        }
    }

    /// Print the end-of-run summary and failure details
    pub fn finish(&self, runs: &[FileRun]) {
        // Progress characters need a newline before the summary
        if !self.verbose && runs.iter().any(|r| !r.cases.is_empty()) {
            println!();
        }

        println!();
        let summary = RunSummary::from_runs(runs);
        self.print_summary(&summary);
        self.print_failures(runs);
    }

    /// Print a single case result
    fn print_case(&self, run: &FileRun, case: &TestCase) {
        if !self.verbose {
            print!("{}", paint(&case.outcome, &case.outcome.symbol().to_string()));
            let _ = io::stdout().flush();
            return;
        }

        println!("{}", case_line(run, case));
    }

    /// Print summary statistics
    fn print_summary(&self, summary: &RunSummary) {
        println!("{}", "─".repeat(50));

        let status = if summary.was_successful() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };

        println!("Test result: {} | {}", status, summary.counts_text());
        println!("{}", ran_line(summary));
    }

    /// Print details of failed cases
    fn print_failures(&self, runs: &[FileRun]) {
        let failing: Vec<&FileRun> = runs.iter().filter(|r| !r.is_success()).collect();

        if failing.is_empty() {
            return;
        }

        println!();
        println!("{}", "Failures:".red().bold());
        println!();

        for run in failing {
            for case in run.problems() {
                println!(
                    "  {} {} {}",
                    "●".red(),
                    case_name(run, case),
                    format!("[{}]", case.outcome.label()).dimmed()
                );
                for line in &case.diagnostics {
                    println!("      {}", line.dimmed());
                }
            }

            let stderr_tail = tail_lines(&run.stderr, STDERR_TAIL);
            if !stderr_tail.is_empty() {
                println!("    {}", "stderr:".yellow());
                for line in stderr_tail {
                    println!("      {}", line.dimmed());
                }
            }
            println!();
        }
    }
}

/// `file :: description`, or just the file when they coincide
fn case_name(run: &FileRun, case: &TestCase) -> String {
    let file = run.file.name();
    if case.description.is_empty() {
        format!("{} :: #{}", file, case.number)
    } else if case.description == file {
        file
    } else {
        format!("{} :: {}", file, case.description)
    }
}

/// Verbose line for one case, e.g. `SKIP a_tests.sh :: fetch (no network)`
fn case_line(run: &FileRun, case: &TestCase) -> String {
    let tag = match &case.outcome {
        Outcome::Pass => "PASS",
        Outcome::Fail => "FAIL",
        Outcome::Error => "ERROR",
        Outcome::Skip { .. } => "SKIP",
        Outcome::ExpectedFailure { .. } => "XFAIL",
        Outcome::UnexpectedSuccess { .. } => "XPASS",
    };

    let mut line = format!("{} {}", paint(&case.outcome, tag).bold(), case_name(run, case));
    if let Some(reason) = case.outcome.reason().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({})", reason.dimmed()));
    }
    line
}

fn ran_line(summary: &RunSummary) -> String {
    format!(
        "Ran {} test{} from {} file{} in {:.2?}",
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.files,
        if summary.files == 1 { "" } else { "s" },
        summary.duration
    )
}

fn paint(outcome: &Outcome, text: &str) -> ColoredString {
    match outcome {
        Outcome::Pass => text.green(),
        Outcome::Fail | Outcome::Error | Outcome::UnexpectedSuccess { .. } => text.red(),
        Outcome::Skip { .. } | Outcome::ExpectedFailure { .. } => text.yellow(),
    }
}

/// Machine-readable report of a whole run
pub fn json_report(runs: &[FileRun]) -> Value {
    let summary = RunSummary::from_runs(runs);

    let files: Vec<Value> = runs
        .iter()
        .map(|run| {
            let cases: Vec<Value> = run
                .cases
                .iter()
                .map(|case| {
                    json!({
                        "number": case.number,
                        "description": case.description,
                        "outcome": case.outcome.label(),
                        "reason": case.outcome.reason(),
                        "diagnostics": case.diagnostics,
                    })
                })
                .collect();

            json!({
                "file": run.file.name(),
                "passed": run.is_success(),
                "clean_exit": run.exit.is_clean(),
                "stderr": run.stderr,
                "duration_ms": run.duration.as_millis() as u64,
                "cases": cases,
            })
        })
        .collect();

    json!({
        "success": summary.was_successful(),
        "files": summary.files,
        "tests": summary.total,
        "passed": summary.passed,
        "failed": summary.failed,
        "errors": summary.errors,
        "skipped": summary.skipped,
        "expected_failures": summary.expected_failures,
        "unexpected_successes": summary.unexpected_successes,
        "duration_ms": summary.duration.as_millis() as u64,
        "results": files,
    })
}
