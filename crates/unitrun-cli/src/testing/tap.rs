//! Test Anything Protocol parsing
//!
//! Test files report individual cases on stdout as TAP:
//!
//! ```text
//! 1..3
//! ok 1 - queue accepts events
//! not ok 2 - timer fires in order
//! # expected 2, got 3
//! ok 3 - cancel # SKIP needs a clock
//! ```
//!
//! Lines that are not TAP are ordinary program output and are ignored.

use crate::testing::result::{Outcome, TestCase};

/// Declared plan (`1..N`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub count: u32,
    /// Reason given by `1..0 # SKIP reason`
    pub skip_all: Option<String>,
}

/// Everything recognized in one file's output
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TapReport {
    pub version: Option<u32>,
    pub plan: Option<Plan>,
    pub cases: Vec<TestCase>,
    pub bail_out: Option<String>,
}

impl TapReport {
    /// Whether the output contained any TAP at all
    pub fn is_tap(&self) -> bool {
        self.version.is_some()
            || self.plan.is_some()
            || !self.cases.is_empty()
            || self.bail_out.is_some()
    }
}

/// A single classified output line
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Version(u32),
    Plan(Plan),
    Case {
        ok: bool,
        number: Option<u32>,
        description: &'a str,
        directive: Option<Directive<'a>>,
    },
    BailOut(&'a str),
    Diagnostic(&'a str),
    Other,
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Skip(&'a str),
    Todo(&'a str),
}

/// Parse the full stdout of a test file
pub fn parse(output: &str) -> TapReport {
    let mut report = TapReport::default();

    for raw in output.lines() {
        match classify(raw.trim_end()) {
            Line::Version(v) => report.version = Some(v),
            Line::Plan(plan) => {
                if report.plan.is_none() {
                    report.plan = Some(plan);
                }
            }
            Line::Case {
                ok,
                number,
                description,
                directive,
            } => {
                let number = number.unwrap_or(report.cases.len() as u32 + 1);
                let outcome = match (ok, directive) {
                    (_, Some(Directive::Skip(reason))) => Outcome::Skip {
                        reason: reason.to_string(),
                    },
                    (false, Some(Directive::Todo(reason))) => Outcome::ExpectedFailure {
                        reason: reason.to_string(),
                    },
                    (true, Some(Directive::Todo(reason))) => Outcome::UnexpectedSuccess {
                        reason: reason.to_string(),
                    },
                    (true, None) => Outcome::Pass,
                    (false, None) => Outcome::Fail,
                };
                report
                    .cases
                    .push(TestCase::new(number, description, outcome));
            }
            Line::BailOut(reason) => {
                report.bail_out = Some(reason.to_string());
                break;
            }
            Line::Diagnostic(text) => {
                if let Some(last) = report.cases.last_mut() {
                    last.diagnostics.push(text.to_string());
                }
            }
            Line::Other => {}
        }
    }

    report
}

fn classify(line: &str) -> Line<'_> {
    if let Some(rest) = line.strip_prefix("TAP version ") {
        if let Ok(v) = rest.trim().parse() {
            return Line::Version(v);
        }
        return Line::Other;
    }

    if let Some(rest) = line.strip_prefix("Bail out!") {
        return Line::BailOut(rest.trim());
    }

    if let Some(rest) = line.strip_prefix("1..") {
        if let Some(plan) = parse_plan(rest) {
            return Line::Plan(plan);
        }
        return Line::Other;
    }

    if let Some(rest) = strip_keyword(line, "not ok") {
        return parse_case(false, rest);
    }
    if let Some(rest) = strip_keyword(line, "ok") {
        return parse_case(true, rest);
    }

    if let Some(rest) = line.strip_prefix('#') {
        return Line::Diagnostic(rest.strip_prefix(' ').unwrap_or(rest));
    }

    Line::Other
}

/// Strip `keyword` when followed by end of line or whitespace
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        _ => None,
    }
}

fn parse_plan(rest: &str) -> Option<Plan> {
    let (count, comment) = match rest.split_once('#') {
        Some((count, comment)) => (count, Some(comment.trim())),
        None => (rest, None),
    };
    let count: u32 = count.trim().parse().ok()?;

    let skip_all = match (count, comment) {
        (0, Some(comment)) => Some(
            strip_directive(comment, "skip")
                .unwrap_or(comment)
                .to_string(),
        ),
        (0, None) => Some(String::new()),
        _ => None,
    };

    Some(Plan { count, skip_all })
}

fn parse_case(ok: bool, rest: &str) -> Line<'_> {
    let rest = rest.trim_start();
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let number = rest[..digits].parse().ok();
    let rest = rest[digits..].trim_start();
    let rest = rest.strip_prefix('-').unwrap_or(rest).trim_start();

    let (description, directive) = split_directive(rest);

    Line::Case {
        ok,
        number,
        description: description.trim(),
        directive,
    }
}

/// Split `description # DIRECTIVE reason`; a `#` not followed by SKIP/TODO stays in the description
fn split_directive(text: &str) -> (&str, Option<Directive<'_>>) {
    for (idx, _) in text.match_indices('#') {
        let tail = text[idx + 1..].trim_start();
        if let Some(reason) = strip_directive(tail, "skip") {
            return (&text[..idx], Some(Directive::Skip(reason)));
        }
        if let Some(reason) = strip_directive(tail, "todo") {
            return (&text[..idx], Some(Directive::Todo(reason)));
        }
    }
    (text, None)
}

/// Case-insensitive directive keyword; trailing letters (`SKIPPED`) are allowed
fn strip_directive<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = text[keyword.len()..]
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_start()
        .trim_start_matches(':');
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plan_and_cases() {
        let report = parse(
            "1..3\n\
             ok 1 - queue accepts events\n\
             not ok 2 - timer fires in order\n\
             ok 3\n",
        );

        assert_eq!(
            report.plan,
            Some(Plan {
                count: 3,
                skip_all: None
            })
        );
        assert_eq!(report.cases.len(), 3);
        assert_eq!(report.cases[0].description, "queue accepts events");
        assert_eq!(report.cases[0].outcome, Outcome::Pass);
        assert_eq!(report.cases[1].outcome, Outcome::Fail);
        assert_eq!(report.cases[2].number, 3);
        assert_eq!(report.cases[2].description, "");
    }

    #[test]
    fn test_numbers_are_assigned_when_missing() {
        let report = parse("ok - first\nok - second\n");
        let numbers: Vec<u32> = report.cases.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_directives() {
        let report = parse(
            "ok 1 - cancel # SKIP needs a clock\n\
             not ok 2 - reorder # TODO not implemented\n\
             ok 3 - retry # todo flaky upstream\n\
             ok 4 - issue #42 regression\n",
        );

        assert_eq!(
            report.cases[0].outcome,
            Outcome::Skip {
                reason: "needs a clock".to_string()
            }
        );
        assert_eq!(report.cases[0].description, "cancel");
        assert_eq!(
            report.cases[1].outcome,
            Outcome::ExpectedFailure {
                reason: "not implemented".to_string()
            }
        );
        assert_eq!(
            report.cases[2].outcome,
            Outcome::UnexpectedSuccess {
                reason: "flaky upstream".to_string()
            }
        );
        assert_eq!(report.cases[3].outcome, Outcome::Pass);
        assert_eq!(report.cases[3].description, "issue #42 regression");
    }

    #[test]
    fn test_diagnostics_attach_to_previous_case() {
        let report = parse(
            "# setting up\n\
             not ok 1 - sums\n\
             # expected: 4\n\
             #   got: 5\n\
             ok 2 - products\n",
        );

        assert_eq!(report.cases[0].diagnostics, vec!["expected: 4", "  got: 5"]);
        assert!(report.cases[1].diagnostics.is_empty());
    }

    #[test]
    fn test_bail_out_stops_parsing() {
        let report = parse("1..2\nok 1\nBail out! database unavailable\nok 2\n");
        assert_eq!(report.bail_out.as_deref(), Some("database unavailable"));
        assert_eq!(report.cases.len(), 1);
    }

    #[test]
    fn test_skip_all_plan() {
        let report = parse("1..0 # Skipped: no network\n");
        assert_eq!(
            report.plan,
            Some(Plan {
                count: 0,
                skip_all: Some("no network".to_string())
            })
        );
        assert!(report.is_tap());
    }

    #[test]
    fn test_plain_output_is_not_tap() {
        let report = parse("running scheduler checks\nokay then\nall good\n");
        assert!(!report.is_tap());
        assert!(report.cases.is_empty());
    }

    #[test]
    fn test_version_and_trailing_plan() {
        let report = parse("TAP version 13\nok 1\nok 2\n1..2\n");
        assert_eq!(report.version, Some(13));
        assert_eq!(report.plan.map(|p| p.count), Some(2));
    }

    #[test]
    fn test_indented_subtest_lines_are_ignored() {
        let report = parse("    ok 1 - inner\nok 1 - outer\n");
        assert_eq!(report.cases.len(), 1);
        assert_eq!(report.cases[0].description, "outer");
    }
}
