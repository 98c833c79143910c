//! Configuration management module.
//!
//! This module handles loading and saving the application configuration:
//! where persisted state lives, how verbose logging is, how slow the
//! simulated backend is and which credentials it accepts.

mod error;

pub use error::ConfigError;

use crate::api::{Credentials, Latency};
use crate::error::AppError;
use log::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

const FILE_NAME: &str = "config.yml";
const STORAGE_DIRECTORY: &str = "storage";
const DEFAULT_DIRECTORY_PATH: &str = ".config/sandbox-stores";

/// Oversees management of configuration file.
///
#[derive(Clone, Debug)]
pub struct Config {
    pub storage_dir: Option<PathBuf>,
    pub log_level: String,
    pub latency: Latency,
    pub demo_credentials: Credentials,
    file_path: Option<PathBuf>,
}

/// Define specification for configuration file.
///
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct FileSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    latency: Latency,
    demo_credentials: Credentials,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Return a new instance holding the defaults.
    ///
    pub fn new() -> Config {
        Config {
            storage_dir: None,
            log_level: default_log_level(),
            latency: Latency::default(),
            demo_credentials: Credentials::default(),
            file_path: None,
        }
    }

    /// Try to load an existing configuration from the disk using the custom
    /// directory if provided. A missing file leaves the defaults in place.
    ///
    pub fn load(&mut self, custom_path: Option<&str>) -> Result<(), AppError> {
        let dir_path = match custom_path {
            Some(path) => Path::new(&path).to_path_buf(),
            None => Config::default_path()?,
        };

        if !dir_path.exists() {
            fs::create_dir_all(&dir_path).map_err(|e| ConfigError::CreateDirectoryFailed {
                path: dir_path.clone(),
                source: e,
            })?;
        }

        let file_path = dir_path.join(Path::new(FILE_NAME));
        if file_path.exists() {
            info!("Loading configuration from {}...", file_path.display());
            let contents = fs::read_to_string(&file_path).map_err(|e| ConfigError::LoadFailed {
                path: file_path.clone(),
                message: format!("IO error: {}", e),
            })?;
            let data: FileSpec = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::DeserializationFailed(e.to_string()))?;
            self.storage_dir = data.storage_dir;
            self.log_level = data.log_level.unwrap_or_else(default_log_level);
            self.latency = data.latency;
            self.demo_credentials = data.demo_credentials;
        } else {
            debug!("No configuration at {}; using defaults.", file_path.display());
        }
        self.file_path = Some(file_path);
        self.level_filter()?;
        Ok(())
    }

    /// Serialize the configuration and write it to the disk.
    ///
    pub fn save(&self) -> Result<(), AppError> {
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;
        let data = FileSpec {
            storage_dir: self.storage_dir.clone(),
            log_level: Some(self.log_level.clone()),
            latency: self.latency.clone(),
            demo_credentials: self.demo_credentials.clone(),
        };
        let content = serde_yaml::to_string(&data)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut file = fs::File::create(file_path).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        write!(file, "{}", content).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Directory of the file-backed store: the configured one, or `storage`
    /// next to the configuration file.
    ///
    pub fn storage_path(&self) -> Result<PathBuf, AppError> {
        if let Some(dir) = &self.storage_dir {
            return Ok(dir.clone());
        }
        let base = match self.file_path.as_ref().and_then(|p| p.parent()) {
            Some(dir) => dir.to_path_buf(),
            None => Config::default_path()?,
        };
        Ok(base.join(STORAGE_DIRECTORY))
    }

    /// Parse the configured log level.
    ///
    pub fn level_filter(&self) -> Result<LevelFilter, AppError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()).into())
    }

    /// Returns the path buffer for the default configuration directory or an
    /// error if the home directory could not be found.
    ///
    fn default_path() -> Result<PathBuf, AppError> {
        match dirs::home_dir() {
            Some(home) => Ok(home.join(Path::new(DEFAULT_DIRECTORY_PATH))),
            None => Err(ConfigError::HomeDirectoryNotFound.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_arg(dir: &tempfile::TempDir) -> String {
        dir.path().to_string_lossy().to_string()
    }

    #[test]
    fn missing_file_keeps_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = Config::new();
        config.load(Some(&dir_arg(&dir)))?;
        assert_eq!(config.latency, Latency::default());
        assert_eq!(config.demo_credentials.email, "demo@example.com");
        assert_eq!(config.level_filter()?, LevelFilter::Info);
        assert_eq!(config.storage_path()?, dir.path().join("storage"));
        Ok(())
    }

    #[test]
    fn partial_file_fills_in_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join(FILE_NAME),
            "log_level: debug\nlatency:\n  fetch_users: 10\n",
        )?;
        let mut config = Config::new();
        config.load(Some(&dir_arg(&dir)))?;
        assert_eq!(config.level_filter()?, LevelFilter::Debug);
        assert_eq!(config.latency.fetch_users, 10);
        assert_eq!(config.latency.fetch_todos, 1000);
        Ok(())
    }

    #[test]
    fn save_then_load() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = Config::new();
        config.load(Some(&dir_arg(&dir)))?;
        config.latency = Latency::none();
        config.storage_dir = Some(dir.path().join("elsewhere"));
        config.save()?;

        let mut loaded = Config::new();
        loaded.load(Some(&dir_arg(&dir)))?;
        assert_eq!(loaded.latency, Latency::none());
        assert_eq!(loaded.storage_path()?, dir.path().join("elsewhere"));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(FILE_NAME), "log_level: loud\n")?;
        let mut config = Config::new();
        let result = config.load(Some(&dir_arg(&dir)));
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidLogLevel(_)))
        ));
        Ok(())
    }

    #[test]
    fn save_without_load_fails() {
        let result = Config::new().save();
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::FilePathNotSet))
        ));
    }
}
