//! Connection and path settings.
//!
//! Everything the pipeline needs to reach one appliance lives in an
//! explicit [`Settings`] value loaded from a TOML file and injected into
//! the transport and orchestrator constructors. There is no process-wide
//! configuration state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub device: DeviceSettings,
    #[serde(default)]
    pub paths: RemotePaths,
}

/// How to reach and authenticate against the appliance.
///
/// When `key_file` is set, key-based authentication is attempted first and
/// the password is used only as a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// Remote file locations and the reload entry point used by a push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemotePaths {
    /// Live configuration file.
    pub config: String,
    /// Backup copy taken before the live file is replaced.
    pub backup: String,
    /// Staging location the new file is uploaded to before the move.
    pub staging: String,
    /// Parsed-config cache artifact invalidated after the replace.
    pub cache: String,
    /// Command that makes the appliance reload all services.
    pub reload_command: String,
}

impl Default for RemotePaths {
    fn default() -> Self {
        Self {
            config: "/cf/conf/config.xml".to_string(),
            backup: "/cf/conf/config.xml.bak".to_string(),
            staging: "/tmp/config.xml.staged".to_string(),
            cache: "/tmp/config.cache".to_string(),
            reload_command: "/etc/rc.reload_all".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_port() -> u16 {
    22
}
