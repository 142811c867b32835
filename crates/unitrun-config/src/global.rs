//! Global Configuration (~/.unitrun/config.toml)
//!
//! Handles user-level configuration stored in `~/.unitrun/config.toml`.

use crate::project::validate_interpreters;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.unitrun/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Output preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// User-wide interpreter defaults, overridden per project
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub interpreters: BTreeMap<String, String>,
}

/// Output preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Colored output (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// One line per test case instead of progress dots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl GlobalConfig {
    /// Load global configuration from a file
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

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        validate_interpreters("interpreters", &self.interpreters)
    }

    /// Get the global config file path (~/.unitrun/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".unitrun").join("config.toml"))
    }

    /// Whether color is enabled (defaults to true)
    pub fn color(&self) -> bool {
        self.output.as_ref().and_then(|o| o.color).unwrap_or(true)
    }

    /// Whether verbose output is the default
    pub fn verbose(&self) -> bool {
        self.output.as_ref().and_then(|o| o.verbose).unwrap_or(false)
    }
}
