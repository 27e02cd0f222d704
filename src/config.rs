//! Runtime configuration.
//!
//! Values come from compile-time defaults, then an optional JSON file, then
//! command-line flags. Every field in the file is optional.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CONFIG_FILE_NAME, DATABASE_FILE_NAME, DEFAULT_API_URL, DEFAULT_BIND_ADDR,
    DEFAULT_CONNECT_DELAY_MS, DEFAULT_DISCONNECT_DELAY_MS, DEFAULT_USERNAME, METRICS_TICK_PERIOD,
};
use crate::controller::ControllerSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid bind address '{0}'")]
    Bind(String),

    #[error("cannot locate configuration directory: {0}")]
    ConfigDir(std::io::Error),
}

/// Settings shared by the dashboard and `serve`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the API the dashboard talks to.
    pub api_url: String,
    /// Identity sent with every API request.
    pub username: String,
    /// Listen address for `serve`.
    pub bind: String,
    /// SQLite file for `serve`; defaults to the configuration directory.
    pub database: Option<PathBuf>,
    pub connect_delay_ms: u64,
    pub disconnect_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            bind: DEFAULT_BIND_ADDR.to_string(),
            database: None,
            connect_delay_ms: DEFAULT_CONNECT_DELAY_MS,
            disconnect_delay_ms: DEFAULT_DISCONNECT_DELAY_MS,
        }
    }
}

impl Config {
    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the default
    /// `~/.config/tunnelsim/config.json` is used when present and defaults
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let Some(default_path) = crate::utils::home_dir().map(|home| {
            home.join(".config")
                .join(crate::constants::CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME)
        }) else {
            return Ok(Self::default());
        };

        if default_path.is_file() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies global command-line overrides.
    pub fn apply_overrides(&mut self, api_url: Option<&str>, username: Option<&str>) {
        if let Some(url) = api_url {
            self.api_url = url.to_string();
        }
        if let Some(name) = username {
            self.username = name.to_string();
        }
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] if `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.bind.clone()))
    }

    /// Database path, defaulting to the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the default directory cannot be created.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dir = crate::utils::get_app_config_dir().map_err(ConfigError::ConfigDir)?;
        Ok(dir.join(DATABASE_FILE_NAME))
    }

    /// Timing settings for the connection controller.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            connect_delay: Duration::from_millis(self.connect_delay_ms),
            disconnect_delay: Duration::from_millis(self.disconnect_delay_ms),
            tick_period: METRICS_TICK_PERIOD,
        }
    }
}
