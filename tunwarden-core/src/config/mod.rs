//! Configuration module
//!
//! Holds the per-session launch configuration for the supervised OpenVPN
//! process and the optional TOML profile files consumed by the CLI.

use secrecy::{ExposeSecret, Secret};
use std::path::PathBuf;

pub mod toml_config;

/// Wrapper for the VPN password
///
/// Keeps the credential out of `Debug` output and logs; the value is only
/// exposed at the single point where it is written to the child process
/// or the generated auth file.
#[derive(Clone, Debug)]
pub struct Password(Secret<String>);

impl Password {
    /// Create a new password wrapper
    pub fn new(password: String) -> Self {
        Self(Secret::new(password))
    }

    /// Expose the secret value (use with caution!)
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for Password {
    fn from(password: String) -> Self {
        Self::new(password)
    }
}

impl From<&str> for Password {
    fn from(password: &str) -> Self {
        Self::new(password.to_string())
    }
}

/// Launch configuration for one supervised OpenVPN session
///
/// `config` points at the OpenVPN configuration file. Sessions built from
/// raw configuration text materialize a temp file first and remember that
/// they own it (see `vpn::artifacts`).
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Path to the OpenVPN configuration file
    pub config: PathBuf,

    /// Username for interactive auth prompts, or the auth file
    pub username: Option<String>,

    /// Password for interactive auth prompts, or the auth file
    pub password: Option<Password>,

    /// Deliver credentials via a generated `--auth-user-pass` file
    /// instead of answering interactive prompts
    pub auth_via_file: bool,

    /// Extra flags appended verbatim, after all generated arguments
    pub extra_args: Vec<String>,
}

impl SessionConfig {
    /// Create a configuration pointing at an existing OpenVPN config file
    pub fn new(config: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            username: None,
            password: None,
            auth_via_file: false,
            extra_args: Vec::new(),
        }
    }

    /// Set the credentials used to answer auth prompts
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<Password>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Deliver credentials through a generated auth file
    pub fn with_auth_file(mut self) -> Self {
        self.auth_via_file = true;
        self
    }

    /// Append extra launch flags, passed through verbatim and last
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Validate the configuration
    ///
    /// Does not parse the OpenVPN config itself; only checks that the
    /// launch parameters are coherent.
    pub fn validate(&self) -> Result<(), String> {
        if self.config.as_os_str().is_empty() {
            return Err("Config path cannot be empty".to_string());
        }

        if self.auth_via_file && (self.username.is_none() || self.password.is_none()) {
            return Err("Auth file delivery requires both username and password".to_string());
        }

        Ok(())
    }
}
