//! Configuration file resolution and loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`~/.config/classview/<file>` on Linux)
//! 4. Compiled defaults (fallback, no file)
//!
//! A missing or unreadable config file is never fatal at startup: the
//! caller logs a warning and continues with compiled defaults. A file that
//! exists but does not parse is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the config directory under the platform config dir
pub const CONFIG_DIR_NAME: &str = "classview";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the resolved config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` style command-line argument
    CommandLine(PathBuf),
    /// Environment variable override
    Environment(PathBuf),
    /// Platform config directory
    ConfigDir(PathBuf),
    /// No file; compiled defaults apply
    Defaults,
}

impl ConfigSource {
    /// Path to read, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::ConfigDir(p) => Some(p.as_path()),
            ConfigSource::Defaults => None,
        }
    }
}

/// Resolves which config file a module should read
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    file_name: String,
    env_var: String,
}

impl ConfigResolver {
    /// Create resolver for a config file name (e.g. `classview-ai.toml`)
    /// and the environment variable that may override its location
    pub fn new(file_name: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            env_var: env_var.into(),
        }
    }

    /// Resolve config location
    ///
    /// Command-line and environment paths are returned even if they do not
    /// exist yet; the loader reports that case. The config-dir candidate is
    /// only returned when the file is present.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> ConfigSource {
        if let Some(path) = cli_arg {
            return ConfigSource::CommandLine(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        if let Some(path) = self.default_path() {
            if path.exists() {
                return ConfigSource::ConfigDir(path);
            }
        }

        ConfigSource::Defaults
    }

    /// Platform-dependent default location of the config file
    pub fn default_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(&self.file_name))
    }
}

/// Parse a TOML config file
///
/// Fields absent from the file take their serde defaults.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Load config from the resolved source, falling back to defaults when the
/// file is missing
///
/// Returns an error only when a file exists and cannot be parsed.
pub fn load_or_default<T: DeserializeOwned + Default>(source: &ConfigSource) -> Result<T> {
    let Some(path) = source.path() else {
        info!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(T::default());
    }

    debug!(path = %path.display(), "Loading config file");
    let config = load_toml(path)?;
    info!(path = %path.display(), "Config loaded");
    Ok(config)
}
