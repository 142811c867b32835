//! Project Configuration (unitrun.toml)
//!
//! Handles project-level configuration stored in `unitrun.toml` at the project root.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project configuration from unitrun.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Where and what to discover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<DiscoveryConfig>,

    /// Execution settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,

    /// Interpreter per file extension (e.g. `py = "python3 -u"`)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub interpreters: BTreeMap<String, String>,
}

/// Discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Directory to search, relative to this file (default: "tests")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// File-name glob (default: "*tests.*")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Working directory for test processes (default: the project root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_level: Option<PathBuf>,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Per-file timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Stop after the first failing file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    /// Treat an empty discovery as a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_if_empty: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(discovery) = &self.discovery {
            if let Some(pattern) = &discovery.pattern {
                validate_pattern("discovery.pattern", pattern)?;
            }

            if let Some(root) = &discovery.root {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "discovery.root".to_string(),
                        reason: "root cannot be empty".to_string(),
                    });
                }
            }
        }

        if let Some(runner) = &self.runner {
            if runner.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "runner.timeout_secs".to_string(),
                    reason: "timeout must be at least one second".to_string(),
                });
            }
        }

        validate_interpreters("interpreters", &self.interpreters)
    }

    /// Configured discovery root, if any
    pub fn root(&self) -> Option<&Path> {
        self.discovery.as_ref().and_then(|d| d.root.as_deref())
    }

    /// Configured file pattern, if any
    pub fn pattern(&self) -> Option<&str> {
        self.discovery.as_ref().and_then(|d| d.pattern.as_deref())
    }

    /// Configured top-level directory, if any
    pub fn top_level(&self) -> Option<&Path> {
        self.discovery.as_ref().and_then(|d| d.top_level.as_deref())
    }
}

/// Validate a file-name glob
pub(crate) fn validate_pattern(field: &str, pattern: &str) -> ConfigResult<()> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "pattern cannot be empty".to_string(),
        });
    }

    // Patterns match a single file name, never a path
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' must match a file name, not a path", pattern),
        });
    }

    Ok(())
}

/// Validate an extension -> command table
pub(crate) fn validate_interpreters(
    section: &str,
    interpreters: &BTreeMap<String, String>,
) -> ConfigResult<()> {
    for (ext, command) in interpreters {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.{}", section, ext),
                reason: "extension must be non-empty and given without a leading dot".to_string(),
            });
        }
        if command.split_whitespace().next().is_none() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.{}", section, ext),
                reason: "command cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_project_config() {
        let toml = r#"
[discovery]
root = "event_scheduler_tests/unit_tests"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.root(),
            Some(Path::new("event_scheduler_tests/unit_tests"))
        );
        assert_eq!(config.pattern(), None);
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[discovery]
root = "tests/unit"
pattern = "*_tests.py"
top_level = "."

[runner]
timeout_secs = 30
fail_fast = true
fail_if_empty = false

[interpreters]
py = "python3 -u"
sh = "bash"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.pattern(), Some("*_tests.py"));
        assert_eq!(config.runner.as_ref().unwrap().timeout_secs, Some(30));
        assert_eq!(config.interpreters.get("py").unwrap(), "python3 -u");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[discovery]
roots = "tests"
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_pattern_validation() {
        assert!(validate_pattern("p", "*tests.py").is_ok());
        assert!(validate_pattern("p", "").is_err());
        assert!(validate_pattern("p", "unit/*tests.py").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ProjectConfig {
            runner: Some(RunnerConfig {
                timeout_secs: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interpreter_validation() {
        let mut interpreters = BTreeMap::new();
        interpreters.insert(".py".to_string(), "python3".to_string());
        assert!(validate_interpreters("interpreters", &interpreters).is_err());

        let mut interpreters = BTreeMap::new();
        interpreters.insert("py".to_string(), "   ".to_string());
        assert!(validate_interpreters("interpreters", &interpreters).is_err());
    }
}
