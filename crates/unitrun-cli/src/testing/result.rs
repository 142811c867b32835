//! Test outcomes and aggregate results

use crate::testing::discovery::TestFile;
use std::time::Duration;

/// Outcome of a single test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Test passed
    Pass,
    /// Assertion failure reported by the test
    Fail,
    /// The test could not run to completion (load failure, crash, timeout, bail out)
    Error,
    /// Test was skipped
    Skip { reason: String },
    /// Failure that was marked as expected
    ExpectedFailure { reason: String },
    /// Test marked as expected to fail passed anyway
    UnexpectedSuccess { reason: String },
}

impl Outcome {
    /// Whether this outcome breaks the run
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Outcome::Fail | Outcome::Error | Outcome::UnexpectedSuccess { .. }
        )
    }

    /// Progress character for compact output
    pub fn symbol(&self) -> char {
        match self {
            Outcome::Pass => '.',
            Outcome::Fail => 'F',
            Outcome::Error => 'E',
            Outcome::Skip { .. } => 's',
            Outcome::ExpectedFailure { .. } => 'x',
            Outcome::UnexpectedSuccess { .. } => 'u',
        }
    }

    /// Label for verbose and JSON output
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Error => "error",
            Outcome::Skip { .. } => "skip",
            Outcome::ExpectedFailure { .. } => "expected_failure",
            Outcome::UnexpectedSuccess { .. } => "unexpected_success",
        }
    }

    /// Directive reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Skip { reason }
            | Outcome::ExpectedFailure { reason }
            | Outcome::UnexpectedSuccess { reason } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// A single reported test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Position within its file, 1-based
    pub number: u32,
    /// Human-readable description
    pub description: String,
    /// Result of the case
    pub outcome: Outcome,
    /// Diagnostic lines attached to the case
    pub diagnostics: Vec<String>,
}

impl TestCase {
    pub fn new(number: u32, description: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            number,
            description: description.into(),
            outcome,
            diagnostics: Vec::new(),
        }
    }

    /// Attach a diagnostic message
    pub fn with_diagnostic(mut self, line: impl Into<String>) -> Self {
        self.diagnostics.push(line.into());
        self
    }
}

/// How a test process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Process exited with a status code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled(i32),
    /// Process was killed after exceeding the timeout
    TimedOut,
    /// Process could not be started
    NotStarted,
}

impl ExitState {
    /// Exited normally with status 0
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

/// Result of executing one test file
#[derive(Debug, Clone)]
pub struct FileRun {
    /// The file that was run
    pub file: TestFile,
    /// Cases reported by (or synthesized for) the file
    pub cases: Vec<TestCase>,
    /// How the process ended
    pub exit: ExitState,
    /// Captured standard error
    pub stderr: String,
    /// Wall-clock time spent on the file
    pub duration: Duration,
}

impl FileRun {
    /// Whether every case in the file passed
    pub fn is_success(&self) -> bool {
        !self.cases.iter().any(|c| c.outcome.is_problem())
    }

    /// Cases that break the run
    pub fn problems(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter().filter(|c| c.outcome.is_problem())
    }
}

/// Aggregate counters across a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub expected_failures: usize,
    pub unexpected_successes: usize,
    pub duration: Duration,
}

impl RunSummary {
    /// Fold file runs into counters
    pub fn from_runs(runs: &[FileRun]) -> Self {
        let mut summary = RunSummary {
            files: runs.len(),
            ..Default::default()
        };

        for run in runs {
            summary.duration += run.duration;
            for case in &run.cases {
                summary.total += 1;
                match case.outcome {
                    Outcome::Pass => summary.passed += 1,
                    Outcome::Fail => summary.failed += 1,
                    Outcome::Error => summary.errors += 1,
                    Outcome::Skip { .. } => summary.skipped += 1,
                    Outcome::ExpectedFailure { .. } => summary.expected_failures += 1,
                    Outcome::UnexpectedSuccess { .. } => summary.unexpected_successes += 1,
                }
            }
        }

        summary
    }

    /// True iff nothing failed, errored or unexpectedly succeeded
    pub fn was_successful(&self) -> bool {
        self.failed == 0 && self.errors == 0 && self.unexpected_successes == 0
    }

    /// Plain counter text, e.g. `3 total, 2 passed, 1 failed, 0 errors, 0 skipped`
    pub fn counts_text(&self) -> String {
        let mut text = format!(
            "{} total, {} passed, {} failed, {} {}, {} skipped",
            self.total,
            self.passed,
            self.failed,
            self.errors,
            if self.errors == 1 { "error" } else { "errors" },
            self.skipped
        );
        if self.expected_failures > 0 {
            text.push_str(&format!(", {} expected failures", self.expected_failures));
        }
        if self.unexpected_successes > 0 {
            text.push_str(&format!(
                ", {} unexpected successes",
                self.unexpected_successes
            ));
        }
        text
    }
}

/// Last `n` non-blank lines of captured output
pub(crate) fn tail_lines(output: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file_run(name: &str, outcomes: Vec<Outcome>) -> FileRun {
        FileRun {
            file: TestFile::new(PathBuf::from("/t").join(name), PathBuf::from(name)),
            cases: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| TestCase::new(i as u32 + 1, format!("case {}", i + 1), o))
                .collect(),
            exit: ExitState::Exited(0),
            stderr: String::new(),
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_summary_counts() {
        let runs = vec![
            file_run("a_tests.sh", vec![Outcome::Pass, Outcome::Pass]),
            file_run(
                "b_tests.sh",
                vec![
                    Outcome::Fail,
                    Outcome::Skip {
                        reason: "no db".to_string(),
                    },
                ],
            ),
        ];

        let summary = RunSummary::from_runs(&runs);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.duration, Duration::from_millis(20));
        assert!(!summary.was_successful());
    }

    #[test]
    fn test_skips_and_expected_failures_are_successful() {
        let runs = vec![file_run(
            "a_tests.sh",
            vec![
                Outcome::Pass,
                Outcome::Skip {
                    reason: String::new(),
                },
                Outcome::ExpectedFailure {
                    reason: "bug 12".to_string(),
                },
            ],
        )];
        assert!(RunSummary::from_runs(&runs).was_successful());
        assert!(runs[0].is_success());
    }

    #[test]
    fn test_unexpected_success_breaks_run() {
        let runs = vec![file_run(
            "a_tests.sh",
            vec![Outcome::UnexpectedSuccess {
                reason: "flaky".to_string(),
            }],
        )];
        assert!(!RunSummary::from_runs(&runs).was_successful());
        assert_eq!(runs[0].problems().count(), 1);
    }

    #[test]
    fn test_empty_run_is_vacuously_successful() {
        let summary = RunSummary::from_runs(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.was_successful());
    }

    #[test]
    fn test_counts_text() {
        let summary = RunSummary {
            files: 2,
            total: 3,
            passed: 1,
            failed: 1,
            errors: 1,
            ..Default::default()
        };
        insta::assert_snapshot!(
            summary.counts_text(),
            @"3 total, 1 passed, 1 failed, 1 error, 0 skipped"
        );
    }

    #[test]
    fn test_outcome_symbols() {
        assert_eq!(Outcome::Pass.symbol(), '.');
        assert_eq!(Outcome::Fail.symbol(), 'F');
        assert_eq!(Outcome::Error.symbol(), 'E');
        assert_eq!(
            Outcome::Skip {
                reason: String::new()
            }
            .label(),
            "skip"
        );
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\n\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("only\n", 5), vec!["only"]);
        assert!(tail_lines("", 3).is_empty());
    }
}
