//! Service configuration loaded from a TOML file.
//!
//! Every section has defaults, so an absent file yields a usable
//! configuration. A file that exists but cannot be parsed is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding [`DatabaseConfig::url`].
pub const DATABASE_URL_ENV: &str = "REUNION_DATABASE_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReunionConfig {
    /// Relational store settings.
    pub database: DatabaseConfig,
    /// Task dispatcher tuning.
    pub dispatch: DispatchConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Relational store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/reunion".to_owned(),
            max_connections: 8,
        }
    }
}

/// Task dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Prefix of generated task numbers.
    pub task_number_prefix: String,
    /// Attempts made to find an unused task number before giving up.
    pub task_number_attempts: u32,
    /// Default number of pending tasks drawn by one auto-assignment run.
    pub auto_assign_limit: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            task_number_prefix: "TK".to_owned(),
            task_number_attempts: 10,
            auto_assign_limit: 20,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emits JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file contents are not valid configuration TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting is present but unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Dotted setting name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl ReunionConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values that fail validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file does not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database.url = url;
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.task_number_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch.task_number_attempts",
                reason: "must be at least 1",
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "database.max_connections",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
