//! unitrun Configuration System
//!
//! Provides configuration management for the unitrun test bootstrapper:
//! - Project configuration (unitrun.toml)
//! - Global user configuration (~/.unitrun/config.toml)
//! - Configuration precedence and merging into effective settings
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults (`tests` directory, `*tests.*` pattern)
//! 2. Global config (~/.unitrun/config.toml)
//! 3. Project config (./unitrun.toml, found by walking up)
//! 4. Environment variables (UNITRUN_*)
//! 5. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use unitrun_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("discovering {} under {}", config.pattern(), config.start_dir().display());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "unitrun.toml";

/// Default discovery root, relative to the top-level directory
pub const DEFAULT_ROOT: &str = "tests";

/// Default file-name pattern
pub const DEFAULT_PATTERN: &str = "*tests.*";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value for environment variable {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::ProjectConfig;
