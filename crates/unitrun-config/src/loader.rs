//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{validate_pattern, DiscoveryConfig, ProjectConfig, RunnerConfig};
use crate::{ConfigError, ConfigResult, DEFAULT_PATTERN, DEFAULT_ROOT, PROJECT_CONFIG_FILE};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interpreters known without any configuration
const DEFAULT_INTERPRETERS: &[(&str, &str)] = &[
    ("bash", "bash"),
    ("js", "node"),
    ("pl", "perl"),
    // Loads unittest modules by import; the runner passes a path relative
    // to the working directory
    ("py", "python3 -m unittest"),
    ("rb", "ruby"),
    ("sh", "sh"),
];

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.unitrun/config.toml) - lowest priority
/// 2. Project config (./unitrun.toml) - overrides global
/// 3. Environment variables (UNITRUN_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Directory relative paths resolve against: where unitrun.toml was
    /// found, or the starting directory when there is none
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.unitrun/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find unitrun.toml, then loads and merges
    /// global config if it exists. Without a project file, relative paths
    /// resolve against `start_dir`.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let base_dir = project_root.unwrap_or_else(|| start_dir.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            base_dir,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let base_dir = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            project: project_config,
            global: global_config,
            base_dir,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); both default when nothing is found
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.is_file() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration; a missing file or home directory yields defaults
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.global_config_path.is_none() {
            match GlobalConfig::global_config_path() {
                Ok(path) => self.global_config_path = Some(path),
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            Some(path) if path.exists() => GlobalConfig::load_from_file(path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized: UNITRUN_DIR, UNITRUN_PATTERN, UNITRUN_TIMEOUT, UNITRUN_FAIL_FAST.
    /// They replace the matching unitrun.toml keys, so a relative UNITRUN_DIR
    /// resolves against the project root just like `[discovery] root`.
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(root) = env::var("UNITRUN_DIR") {
            if !root.is_empty() {
                config
                    .discovery
                    .get_or_insert_with(DiscoveryConfig::default)
                    .root = Some(PathBuf::from(root));
            }
        }

        if let Ok(pattern) = env::var("UNITRUN_PATTERN") {
            validate_pattern("UNITRUN_PATTERN", &pattern)?;
            config
                .discovery
                .get_or_insert_with(DiscoveryConfig::default)
                .pattern = Some(pattern);
        }

        if let Ok(timeout) = env::var("UNITRUN_TIMEOUT") {
            let secs = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    var: "UNITRUN_TIMEOUT".to_string(),
                    value: timeout.clone(),
                })?;
            config
                .runner
                .get_or_insert_with(RunnerConfig::default)
                .timeout_secs = Some(secs);
        }

        if let Ok(fail_fast) = env::var("UNITRUN_FAIL_FAST") {
            if !fail_fast.is_empty() {
                config
                    .runner
                    .get_or_insert_with(RunnerConfig::default)
                    .fail_fast = Some(parse_env_bool("UNITRUN_FAIL_FAST", &fail_fast)?);
            }
        }

        Ok(config)
    }
}

fn parse_env_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Configuration with nothing but built-in defaults, rooted at `base_dir`
    pub fn defaults(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            base_dir: base_dir.into(),
        }
    }

    /// Directory test processes run in
    pub fn top_level(&self) -> PathBuf {
        match self.project.top_level() {
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.clone(),
        }
    }

    /// Directory discovery starts from
    pub fn start_dir(&self) -> PathBuf {
        let root = self.project.root().unwrap_or(Path::new(DEFAULT_ROOT));
        self.base_dir.join(root)
    }

    /// Effective file-name pattern
    pub fn pattern(&self) -> &str {
        self.project.pattern().unwrap_or(DEFAULT_PATTERN)
    }

    /// Per-file timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.project
            .runner
            .as_ref()
            .and_then(|r| r.timeout_secs)
            .map(Duration::from_secs)
    }

    /// Stop after the first failing file
    pub fn fail_fast(&self) -> bool {
        self.project
            .runner
            .as_ref()
            .and_then(|r| r.fail_fast)
            .unwrap_or(false)
    }

    /// Treat an empty discovery as a failure
    pub fn fail_if_empty(&self) -> bool {
        self.project
            .runner
            .as_ref()
            .and_then(|r| r.fail_if_empty)
            .unwrap_or(false)
    }

    /// Interpreter table: built-in defaults < global < project
    pub fn interpreters(&self) -> BTreeMap<String, String> {
        let mut table: BTreeMap<String, String> = DEFAULT_INTERPRETERS
            .iter()
            .map(|(ext, cmd)| (ext.to_string(), cmd.to_string()))
            .collect();
        table.extend(self.global.interpreters.clone());
        table.extend(self.project.interpreters.clone());
        table
    }

    /// Colored output preference
    pub fn color(&self) -> bool {
        self.global.color()
    }

    /// Verbose output preference
    pub fn verbose(&self) -> bool {
        self.global.verbose()
    }
}
