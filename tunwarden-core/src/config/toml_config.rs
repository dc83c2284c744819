//! TOML profile file I/O
//!
//! Loads and saves named connection profiles from the user's
//! configuration directory. Profiles never contain passwords; those come
//! from the environment or an interactive prompt at connect time.

use crate::config::SessionConfig;
use crate::error::{ConfigError, TunwardenError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A connection profile as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Path to the OpenVPN configuration file
    pub config: PathBuf,

    /// Username for auth prompts
    #[serde(default)]
    pub username: Option<String>,

    /// Deliver credentials via a generated auth file
    #[serde(default)]
    pub auth_via_file: bool,

    /// Extra launch flags appended verbatim
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Complete TOML configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// VPN connection profile
    #[serde(rename = "vpn")]
    pub profile: Profile,
}

impl Profile {
    /// Validate the profile
    pub fn validate(&self) -> Result<(), String> {
        if self.config.as_os_str().is_empty() {
            return Err("Profile config path cannot be empty".to_string());
        }
        Ok(())
    }

    /// Convert into a session configuration
    ///
    /// The password, if any, is supplied separately by the caller.
    pub fn into_session_config(self) -> SessionConfig {
        SessionConfig {
            config: self.config,
            username: self.username,
            password: None,
            auth_via_file: self.auth_via_file,
            extra_args: self.extra_args,
        }
    }
}

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/tunwarden, or the TUNWARDEN_CONFIG_DIR environment
/// variable if set (used by tests).
pub fn get_config_dir() -> Result<PathBuf, TunwardenError> {
    if let Ok(config_dir) = std::env::var("TUNWARDEN_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        TunwardenError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("tunwarden"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, TunwardenError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load the profile from the default TOML file
pub fn load_profile() -> Result<Profile, TunwardenError> {
    let config_path = get_config_path()?;
    load_profile_from_path(&config_path)
}

/// Load a profile from a specific TOML file
pub fn load_profile_from_path<P: AsRef<Path>>(path: P) -> Result<Profile, TunwardenError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TunwardenError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => TunwardenError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: TomlConfig = toml::from_str(&contents)?;

    config
        .profile
        .validate()
        .map_err(|e| TunwardenError::Config(ConfigError::ValidationError { message: e }))?;

    Ok(config.profile)
}

/// Save a profile to a specific TOML file
pub fn save_profile_to_path<P: AsRef<Path>>(profile: &Profile, path: P) -> Result<(), TunwardenError> {
    profile
        .validate()
        .map_err(|e| TunwardenError::Config(ConfigError::ValidationError { message: e }))?;

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            TunwardenError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(&TomlConfig {
        profile: profile.clone(),
    })?;

    std::fs::write(&path, contents).map_err(|_| {
        TunwardenError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    Ok(())
}
