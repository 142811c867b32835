//! File-name glob patterns
//!
//! Shell-style globs (`*`, `?`, `[abc]`, `[a-z]`, `[!abc]`) matched against a
//! single file name. Globs compile to an anchored regex.

use anyhow::{bail, Result};
use regex::Regex;
use std::fmt;

/// A compiled file-name pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    glob: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a glob
    pub fn new(glob: &str) -> Result<Self> {
        if glob.is_empty() {
            bail!("pattern cannot be empty");
        }
        let source = glob_to_regex(glob)?;
        let regex = Regex::new(&source)?;
        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Check a file name against the pattern
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The original glob text
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glob)
    }
}

/// Translate a glob into anchored regex source
fn glob_to_regex(glob: &str) -> Result<String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Collapse runs of stars
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let (class, next) = parse_class(&chars, i, glob)?;
                out.push_str(&class);
                i = next;
                continue;
            }
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    out.push_str(")$");
    Ok(out)
}

/// Parse a bracket expression starting at `start` (the `[`).
///
/// Returns the regex class and the index just past the closing `]`.
fn parse_class(chars: &[char], start: usize, glob: &str) -> Result<(String, usize)> {
    let mut i = start + 1;
    let mut class = String::from("[");

    if i < chars.len() && chars[i] == '!' {
        class.push('^');
        i += 1;
    }

    // A `]` in first position is a literal member
    let first = i;
    loop {
        if i >= chars.len() {
            bail!("unterminated character class in pattern '{}'", glob);
        }
        let c = chars[i];
        if c == ']' && i > first {
            break;
        }

        let is_range = i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']';
        if is_range {
            let end = chars[i + 2];
            if end < c {
                bail!("invalid range '{}-{}' in pattern '{}'", c, end, glob);
            }
            class.push_str(&escape_char(c));
            class.push('-');
            class.push_str(&escape_char(end));
            i += 3;
        } else {
            class.push_str(&escape_char(c));
            i += 1;
        }
    }

    class.push(']');
    Ok((class, i + 1))
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("*tests.py", "a_tests.py", true)]
    #[case("*tests.py", "tests.py", true)]
    #[case("*tests.py", "a_tests.pyc", false)]
    #[case("*tests.py", "tests_helper.py", false)]
    #[case("test_?.sh", "test_1.sh", true)]
    #[case("test_?.sh", "test_12.sh", false)]
    #[case("[ab]_tests.*", "a_tests.sh", true)]
    #[case("[ab]_tests.*", "c_tests.sh", false)]
    #[case("[!ab]_tests.*", "c_tests.sh", true)]
    #[case("[!ab]_tests.*", "a_tests.sh", false)]
    #[case("suite[0-9].sh", "suite7.sh", true)]
    #[case("suite[0-9].sh", "suitex.sh", false)]
    #[case("[]]x", "]x", true)]
    #[case("a.b", "axb", false)]
    #[case("a+b(c)", "a+b(c)", true)]
    #[case("*", ".hidden", true)]
    #[case("a*a", "a", false)]
    fn test_glob_matching(#[case] glob: &str, #[case] name: &str, #[case] expected: bool) {
        let pattern = Pattern::new(glob).unwrap();
        assert_eq!(pattern.matches(name), expected, "{} vs {}", glob, name);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(Pattern::new("").is_err());
        assert!(Pattern::new("[abc").is_err());
        assert!(Pattern::new("[!").is_err());
        assert!(Pattern::new("[z-a]").is_err());
    }

    #[test]
    fn test_display_keeps_glob() {
        let pattern = Pattern::new("*tests.*").unwrap();
        assert_eq!(pattern.to_string(), "*tests.*");
        assert_eq!(pattern.as_str(), "*tests.*");
    }

    proptest! {
        #[test]
        fn literal_names_match_themselves(name in "[a-zA-Z0-9_.+()$^-]{1,24}") {
            let pattern = Pattern::new(&name).unwrap();
            prop_assert!(pattern.matches(&name));
        }

        #[test]
        fn star_suffix_matches_any_prefix(prefix in "[a-z_]{0,12}") {
            let pattern = Pattern::new("*tests.py").unwrap();
            let name = format!("{}tests.py", prefix);
            prop_assert!(pattern.matches(&name));
        }
    }
}
