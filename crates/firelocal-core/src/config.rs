//! Configuration management.
//!
//! Holds where the emulator executable and its rules file live, and how long
//! to wait for things. The database endpoint is not part of the
//! configuration; it is fixed by the emulator.
//!
//! Configuration is stored at `~/.config/firelocal/config.json` and every
//! field can be overridden from the environment.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Application name used for the config directory path
const APP_NAME: &str = "firelocal";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// npm installs `firebase-server` here when added as a dev dependency.
const DEFAULT_BIN_DIR: &str = "node_modules/.bin";

const DEFAULT_RULES_FILE: &str = "database.rules.json";

/// The emulator is a node process; first start can be slow on cold caches.
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_WORKING_DIR: &str = "FIRELOCAL_WORKING_DIR";
pub const ENV_BIN_DIR: &str = "FIRELOCAL_BIN_DIR";
pub const ENV_RULES_FILE: &str = "FIRELOCAL_RULES_FILE";
pub const ENV_STARTUP_TIMEOUT_SECS: &str = "FIRELOCAL_STARTUP_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the emulator is started in. `None` means the current directory.
    pub working_dir: Option<PathBuf>,
    /// Directory holding the emulator executable, relative to `working_dir`
    /// unless absolute.
    pub bin_dir: PathBuf,
    /// Security rules file passed to the emulator, relative to `working_dir`
    /// unless absolute.
    pub rules_file: PathBuf,
    pub startup_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_dir: None,
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            rules_file: PathBuf::from(DEFAULT_RULES_FILE),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the user config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)?.with_overrides(|name| std::env::var(name).ok())
    }

    /// Load config from a specific file, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(|e| write_error(e.into()))?;
        std::fs::write(path, contents).map_err(write_error)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_WORKING_DIR) {
            self.working_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(ENV_BIN_DIR) {
            self.bin_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_RULES_FILE) {
            self.rules_file = PathBuf::from(file);
        }
        if let Some(value) = lookup(ENV_STARTUP_TIMEOUT_SECS) {
            self.startup_timeout_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_STARTUP_TIMEOUT_SECS,
                    value,
                })?;
        }
        Ok(self)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Absolute working directory. A relative `working_dir` is taken from the
    /// current directory, so paths derived from it stay valid after the
    /// emulator is started inside it.
    pub fn working_dir(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match self.working_dir {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => cwd.join(dir),
            None => cwd,
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.working_dir().join(&self.bin_dir)
    }

    pub fn rules_file(&self) -> PathBuf {
        self.working_dir().join(&self.rules_file)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bin_dir, PathBuf::from("node_modules/.bin"));
        assert_eq!(config.rules_file, PathBuf::from("database.rules.json"));
        assert_eq!(config.startup_timeout(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_relative_paths_resolve_against_working_dir() {
        let config = Config {
            working_dir: Some(PathBuf::from("/srv/app")),
            ..Config::default()
        };
        assert_eq!(config.bin_dir(), PathBuf::from("/srv/app/node_modules/.bin"));
        assert_eq!(config.rules_file(), PathBuf::from("/srv/app/database.rules.json"));
    }

    #[test]
    fn test_relative_working_dir_is_made_absolute() {
        let config = Config {
            working_dir: Some(PathBuf::from("web")),
            ..Config::default()
        };
        let cwd = std::env::current_dir().expect("current dir");

        assert_eq!(config.working_dir(), cwd.join("web"));
        assert!(config.bin_dir().is_absolute());
        assert!(config.rules_file().is_absolute());
        assert_eq!(config.rules_file(), cwd.join("web").join("database.rules.json"));
    }

    #[test]
    fn test_default_working_dir_is_current_dir() {
        let cwd = std::env::current_dir().expect("current dir");
        assert_eq!(Config::default().working_dir(), cwd);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = Config {
            working_dir: Some(PathBuf::from("/srv/app")),
            rules_file: PathBuf::from("/etc/rules.json"),
            ..Config::default()
        };
        assert_eq!(config.rules_file(), PathBuf::from("/etc/rules.json"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_overrides(lookup_from(&[
                (ENV_WORKING_DIR, "/work"),
                (ENV_BIN_DIR, "bin"),
                (ENV_RULES_FILE, "rules/dev.json"),
                (ENV_STARTUP_TIMEOUT_SECS, " 5 "),
            ]))
            .expect("overrides should apply");

        assert_eq!(config.working_dir, Some(PathBuf::from("/work")));
        assert_eq!(config.bin_dir(), PathBuf::from("/work/bin"));
        assert_eq!(config.rules_file(), PathBuf::from("/work/rules/dev.json"));
        assert_eq!(config.startup_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_timeout_override() {
        let result = Config::default()
            .with_overrides(lookup_from(&[(ENV_STARTUP_TIMEOUT_SECS, "soon")]));
        match result {
            Err(ConfigError::InvalidEnv { name, value }) => {
                assert_eq!(name, ENV_STARTUP_TIMEOUT_SECS);
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidEnv, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from(&dir.path().join("missing.json")).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            working_dir: Some(PathBuf::from("/srv/app")),
            startup_timeout_secs: 90,
            ..Config::default()
        };

        config.save_to(&path).expect("save");
        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"rules_file": "custom.rules.json"}"#).expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.rules_file, PathBuf::from("custom.rules.json"));
        assert_eq!(config.bin_dir, PathBuf::from(DEFAULT_BIN_DIR));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").expect("write");

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
