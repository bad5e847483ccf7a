//! Configuration management system for Dropsy
//!
//! This crate loads the settings that are not part of a watch target: pool size,
//! poll interval, state directory, transport command templates and logging.
//!
//! # Features
//!
//! - **Multiple formats**: YAML, TOML and JSON configuration files
//! - **Validation**: every value is checked before the monitor starts
//! - **Environment overrides**: `DROPSY__WATCH__POLL_INTERVAL_SECS=30` and friends
//! - **Defaults**: a usable configuration with no file at all
//!
//! # Examples
//!
//! ```rust,no_run
//! use dropsy_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("dropsy.yaml")
//!     .add_env_prefix("DROPSY")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Parallel jobs: {}", config.watch.parallelism().get());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use dropsy_types::{Parallelism, PollInterval, DIRS_MAX};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "DROPSY";

/// Main configuration structure for Dropsy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watch loop configuration
    pub watch: WatchConfig,
    /// Transport command configuration
    pub transport: TransportConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Watch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Maximum concurrent transfer jobs (defaults to the CPU count)
    pub parallelism: Option<usize>,
    /// Seconds between cycles; 0 runs a single cycle
    pub poll_interval_secs: u64,
    /// Directory holding state files (defaults to `~/.dropsy`)
    pub state_dir: Option<PathBuf>,
    /// Maximum number of watched directories
    pub max_directories: usize,
}

impl WatchConfig {
    /// Resolved parallelism limit
    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
            .and_then(|limit| Parallelism::new(limit).ok())
            .unwrap_or_default()
    }

    /// Resolved poll interval
    pub fn poll_interval(&self) -> PollInterval {
        PollInterval::from_secs(self.poll_interval_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            parallelism: None,
            poll_interval_secs: 0,
            state_dir: None,
            max_directories: DIRS_MAX,
        }
    }
}

/// Transport command configuration
///
/// Each command is an argv template. `{path}`, `{user}` and `{host}` are replaced
/// per job; the password is only ever passed through the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Command uploading one file
    pub add_command: Vec<String>,
    /// Command deleting the remote copy of one file
    pub delete_command: Vec<String>,
    /// Optional command checking the credentials (empty = always accepted)
    #[serde(default)]
    pub auth_command: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            add_command: vec![
                "scp".to_string(),
                "-q".to_string(),
                "-p".to_string(),
                "{path}".to_string(),
                "{user}@{host}:{path}".to_string(),
            ],
            delete_command: vec![
                "ssh".to_string(),
                "{user}@{host}".to_string(),
                "rm".to_string(),
                "-f".to_string(),
                "{path}".to_string(),
            ],
            auth_command: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            colored_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.watch.poll_interval_secs, 0);
        assert!(!config.watch.poll_interval().is_polling());
        assert_eq!(config.watch.max_directories, DIRS_MAX);
        assert!(config.watch.parallelism().get() >= 1);
        assert!(config.transport.auth_command.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_explicit_parallelism() {
        let watch = WatchConfig {
            parallelism: Some(3),
            ..WatchConfig::default()
        };
        assert_eq!(watch.parallelism().get(), 3);
    }
}
