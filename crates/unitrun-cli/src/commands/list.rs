//! List command - show which files discovery would run

use crate::config::{Overrides, Settings};
use crate::testing::TestSuite;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the list command
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Only list files whose relative path contains this text
    pub filter: Option<String>,
    /// Config file and discovery overrides
    pub overrides: Overrides,
    /// Output in JSON format
    pub json: bool,
    /// Directory relative paths resolve against (defaults to the current directory)
    pub cwd: Option<PathBuf>,
}

#[derive(Serialize)]
struct Listing<'a> {
    root: String,
    pattern: &'a str,
    files: &'a [String],
}

/// Discover test files without running anything
pub fn run(args: ListArgs) -> Result<Vec<String>> {
    let cwd = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let settings = Settings::resolve(&cwd, &args.overrides)?;

    let mut suite = TestSuite::discover(&settings.start_dir, &settings.pattern)?;
    if let Some(filter) = &args.filter {
        suite = suite.filter(filter);
    }

    let names: Vec<String> = suite.files.iter().map(|f| f.name()).collect();

    if args.json {
        let listing = Listing {
            root: suite.root.display().to_string(),
            pattern: settings.pattern.as_str(),
            files: &names,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for name in &names {
            println!("{}", name);
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_list_only_matching_files() {
        let dir = tempdir().unwrap();
        let tests = dir.path().join("tests");
        fs::create_dir(&tests).unwrap();
        fs::write(tests.join("queue_tests.py"), "").unwrap();
        fs::write(tests.join("conftest.py"), "").unwrap();

        let names = run(ListArgs {
            cwd: Some(dir.path().to_path_buf()),
            overrides: Overrides {
                pattern: Some("*tests.py".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        assert_eq!(names, vec!["queue_tests.py"]);
    }

    #[test]
    fn test_list_empty_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();

        let names = run(ListArgs {
            cwd: Some(dir.path().to_path_buf()),
            json: true,
            ..Default::default()
        })
        .unwrap();
        assert!(names.is_empty());
    }
}
