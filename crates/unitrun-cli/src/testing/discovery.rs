//! Test discovery - find test files under a root directory

use crate::testing::pattern::Pattern;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A discovered test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    /// Absolute (or root-joined) path of the file
    pub path: PathBuf,
    /// Path relative to the discovery root
    pub relative: PathBuf,
}

impl TestFile {
    pub fn new(path: PathBuf, relative: PathBuf) -> Self {
        Self { path, relative }
    }

    /// Display name used in reports
    pub fn name(&self) -> String {
        self.relative.display().to_string()
    }

    /// File extension, if any
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// The set of discovered test files
#[derive(Debug, Default)]
pub struct TestSuite {
    /// Directory discovery started from
    pub root: PathBuf,
    /// Matching files, in deterministic order
    pub files: Vec<TestFile>,
    /// Entries that could not be read
    pub problems: Vec<(PathBuf, String)>,
}

impl TestSuite {
    /// Discover all files under `root` whose name matches `pattern`
    pub fn discover(root: &Path, pattern: &Pattern) -> Result<Self> {
        if !root.exists() {
            bail!("Test directory not found: {}", root.display());
        }
        if !root.is_dir() {
            bail!("Test path is not a directory: {}", root.display());
        }

        let mut suite = TestSuite {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    tracing::warn!("skipping unreadable entry {}: {}", path.display(), e);
                    suite.problems.push((path, e.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !pattern.matches(&name) {
                tracing::trace!("ignoring {}", entry.path().display());
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());

            tracing::debug!("discovered {}", relative.display());
            suite
                .files
                .push(TestFile::new(entry.path().to_path_buf(), relative));
        }

        Ok(suite)
    }

    /// Keep only files whose relative path contains `needle`
    pub fn filter(&self, needle: &str) -> Self {
        let files = self
            .files
            .iter()
            .filter(|f| f.name().contains(needle))
            .cloned()
            .collect();

        TestSuite {
            root: self.root.clone(),
            files,
            problems: Vec::new(),
        }
    }

    /// Check if suite has any files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get count of files
    pub fn len(&self) -> usize {
        self.files.len()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
