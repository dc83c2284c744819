//! Foreground connection supervision
//!
//! Connects, mirrors the session's status and log streams to the
//! terminal, and disconnects on Ctrl+C.

use colored::Colorize;
use std::path::PathBuf;
use tunwarden_core::config::{toml_config, SessionConfig};
use tunwarden_core::error::TunwardenError;
use tunwarden_core::vpn::{Session, DEFAULT_DISCONNECT_TIMEOUT};

/// Environment variable supplying the VPN password
const PASSWORD_ENV: &str = "OPENVPN_PASSWORD";

/// Run the connect command
pub async fn run_connect(
    config: Option<PathBuf>,
    profile: Option<PathBuf>,
    username: Option<String>,
    auth_file: bool,
    extra_args: Vec<String>,
) -> Result<(), TunwardenError> {
    let mut session_config = match (config, profile) {
        (Some(path), _) => SessionConfig::new(path),
        (None, Some(profile_path)) => {
            toml_config::load_profile_from_path(profile_path)?.into_session_config()
        }
        (None, None) => toml_config::load_profile()?.into_session_config(),
    };

    if username.is_some() {
        session_config.username = username;
    }
    if auth_file {
        session_config.auth_via_file = true;
    }
    session_config.extra_args.extend(extra_args);

    // Profiles never carry passwords; take one from the environment when
    // a username is configured
    if session_config.username.is_some() && session_config.password.is_none() {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            session_config.password = Some(password.into());
        }
    }

    let mut session = Session::new(session_config)?;

    let mut status_rx = session.subscribe_status();
    tokio::spawn(async move {
        while let Ok(status) = status_rx.recv().await {
            println!("{} {}", "status:".dimmed(), status);
        }
    });

    let mut log_rx = session.subscribe_log();
    tokio::spawn(async move {
        while let Ok(line) = log_rx.recv().await {
            tracing::info!(target: "openvpn", "{}", line);
        }
    });

    session.connect().await?;
    println!("{}", "Connected. Press Ctrl+C to disconnect.".green());

    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    session.disconnect(true, DEFAULT_DISCONNECT_TIMEOUT).await;
    println!("{}", "Disconnected.".green());

    Ok(())
}
