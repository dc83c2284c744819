//! Error types for the tunwarden VPN supervisor
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the tunwarden application
#[derive(Error, Debug)]
pub enum TunwardenError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to VPN supervision operations
    #[error("VPN error: {0}")]
    Vpn(#[from] VpnError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// VPN supervision errors
///
/// Only `Spawn`, `AuthenticationFailed` and `ConnectTimeout` reject
/// operations; termination and cleanup failures are reported through the
/// log stream and never surfaced as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VpnError {
    #[error("Failed to spawn OpenVPN process: {reason}")]
    Spawn { reason: String },

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Connection timeout after {seconds} seconds")]
    ConnectTimeout { seconds: u64 },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("OpenVPN binary not found")]
    BinaryNotFound,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TunwardenError>;
