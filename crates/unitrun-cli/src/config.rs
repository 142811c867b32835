//! CLI configuration
//!
//! Output defaults come from environment variables; discovery and runner
//! settings come from unitrun.toml / ~/.unitrun/config.toml, with command
//! line flags applied last.

use crate::testing::Pattern;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use unitrun_config::{Config as LoadedConfig, ConfigLoader};

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (UNITRUN_JSON=1)
    pub default_json: bool,
    /// Disable colored output (UNITRUN_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env_flag("UNITRUN_JSON"),
            no_color: env_present("UNITRUN_NO_COLOR") || env_present("NO_COLOR"),
        }
    }
}

/// `1`, `true`, `yes` or `on`, case-insensitive
fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Set to a non-empty value (the NO_COLOR convention)
fn env_present(name: &str) -> bool {
    env::var_os(name).is_some_and(|v| !v.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Command line values that take precedence over configuration files
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit project config file
    pub config: Option<PathBuf>,
    /// Discovery root
    pub dir: Option<PathBuf>,
    /// File-name glob
    pub pattern: Option<String>,
    /// Working directory for test processes
    pub top_level: Option<PathBuf>,
    /// Per-file timeout in seconds
    pub timeout: Option<u64>,
    /// Stop after the first failing file
    pub fail_fast: bool,
    /// Treat an empty discovery as a failure
    pub fail_if_empty: bool,
}

/// Effective settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub start_dir: PathBuf,
    pub pattern: Pattern,
    pub top_level: PathBuf,
    pub timeout: Option<Duration>,
    pub fail_fast: bool,
    pub fail_if_empty: bool,
    pub interpreters: BTreeMap<String, String>,
    pub verbose: bool,
    pub color: bool,
}

impl Settings {
    /// Merge configuration files and overrides, resolving paths against `cwd`
    pub fn resolve(cwd: &Path, overrides: &Overrides) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        let loaded = match &overrides.config {
            Some(path) => loader
                .load_from_file(&cwd.join(path))
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => loader
                .load_from_directory(cwd)
                .context("Failed to load configuration")?,
        };

        Self::from_loaded(&loaded, cwd, overrides)
    }

    /// Apply overrides on top of already-loaded configuration
    pub fn from_loaded(loaded: &LoadedConfig, cwd: &Path, overrides: &Overrides) -> Result<Self> {
        let glob = overrides.pattern.as_deref().unwrap_or(loaded.pattern());
        let pattern =
            Pattern::new(glob).with_context(|| format!("Invalid test pattern '{}'", glob))?;

        let timeout = match overrides.timeout {
            Some(0) => bail!("--timeout must be at least one second"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => loaded.timeout(),
        };

        let start_dir = match &overrides.dir {
            Some(dir) => cwd.join(dir),
            None => loaded.start_dir(),
        };
        let top_level = match &overrides.top_level {
            Some(dir) => cwd.join(dir),
            None => loaded.top_level(),
        };

        Ok(Self {
            start_dir,
            pattern,
            top_level,
            timeout,
            fail_fast: overrides.fail_fast || loaded.fail_fast(),
            fail_if_empty: overrides.fail_if_empty || loaded.fail_if_empty(),
            interpreters: loaded.interpreters(),
            verbose: loaded.verbose(),
            color: loaded.color(),
        })
    }
}
