//! Configuration loader utilities

use crate::{Config, ConfigBuilder, ConfigError, ConfigResult, ENV_PREFIX};
use dropsy_types::PROGRAM_NAME;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "toml"];

/// Configuration loader with the usual lookup order
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the first default location that exists,
    /// then apply `DROPSY__*` environment overrides
    pub fn load_default() -> ConfigResult<Config> {
        let mut builder = ConfigBuilder::new().add_defaults();

        if let Some(path) = Self::default_config_paths().into_iter().find(|p| p.exists()) {
            builder = builder.add_source_file(path);
        }

        builder.add_env_prefix(ENV_PREFIX).build()
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Configuration file not found",
                ),
            });
        }

        ConfigBuilder::new()
            .add_defaults()
            .add_source_file(path)
            .add_env_prefix(ENV_PREFIX)
            .build()
    }

    /// Write a configuration file; the format follows the extension (YAML otherwise)
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(config).map_err(|e| ConfigError::Serialization {
                message: format!("Failed to serialize to TOML: {}", e),
            })?,
            Some("json") => {
                serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialization {
                    message: format!("Failed to serialize to JSON: {}", e),
                })?
            }
            _ => serde_yaml::to_string(config)?,
        };

        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the default configuration to `path`
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> ConfigResult<()> {
        Self::save_to_file(&Config::default(), path)
    }

    /// Candidate configuration files in order of preference
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for ext in EXTENSIONS {
            paths.push(PathBuf::from(format!("{}.{}", PROGRAM_NAME, ext)));
        }
        for ext in EXTENSIONS {
            paths.push(PathBuf::from(format!(".{}.{}", PROGRAM_NAME, ext)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join(PROGRAM_NAME);
            for ext in EXTENSIONS {
                paths.push(dir.join(format!("config.{}", ext)));
            }
        }

        #[cfg(unix)]
        for ext in EXTENSIONS {
            paths.push(PathBuf::from(format!("/etc/{}/config.{}", PROGRAM_NAME, ext)));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_missing_file() {
        let result = ConfigLoader::load_from_file("/no/such/dropsy.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_save_and_reload_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.watch.poll_interval_secs = 45;
        config.watch.parallelism = Some(2);
        ConfigLoader::save_to_file(&config, &path).unwrap();

        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded.watch.poll_interval_secs, 45);
        assert_eq!(loaded.watch.parallelism, Some(2));
    }

    #[test]
    fn test_generate_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dropsy.yaml");

        ConfigLoader::generate_default_config(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("add_command"));
        assert!(contents.contains("poll_interval_secs"));
    }

    #[test]
    fn test_default_paths_prefer_working_directory() {
        let paths = ConfigLoader::default_config_paths();
        assert_eq!(paths[0], PathBuf::from("dropsy.yaml"));
    }
}
