//! tunwarden - OpenVPN supervision CLI
//!
//! A command-line tool that supervises an OpenVPN client process:
//! connects in the foreground, reports status, and clears stray
//! processes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tunwarden_core::{error::TunwardenError, init_logging};

mod cli;

#[derive(Parser)]
#[command(name = "tunwarden")]
#[command(about = "Supervise OpenVPN client connections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and supervise in the foreground (Ctrl+C disconnects)
    Connect {
        /// OpenVPN config file; defaults to the profile's config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Profile TOML to load instead of the default one
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Username for auth prompts (overrides the profile)
        #[arg(long)]
        username: Option<String>,
        /// Deliver credentials via a generated auth file
        #[arg(long)]
        auth_file: bool,
        /// Extra flags passed to openvpn verbatim
        #[arg(last = true)]
        extra_args: Vec<String>,
    },
    /// Terminate running OpenVPN processes
    Disconnect {
        /// Skip the graceful interrupt and kill immediately
        #[arg(long)]
        force: bool,
        /// Teardown budget in milliseconds
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,
    },
    /// Show OpenVPN processes and VPN interfaces
    Status {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
    /// List matching OpenVPN processes
    Ps,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Connect {
            config,
            profile,
            username,
            auth_file,
            extra_args,
        } => cli::connect::run_connect(config, profile, username, auth_file, extra_args).await,
        Commands::Disconnect { force, timeout_ms } => {
            cli::disconnect::run_disconnect(force, timeout_ms).await
        }
        Commands::Status { json } => cli::status::run_status(json),
        Commands::Ps => cli::status::run_ps(),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                TunwardenError::Config(_)
                | TunwardenError::Toml(_)
                | TunwardenError::TomlSerialize(_) => 2,
                // VPN and runtime errors (exit code 1)
                TunwardenError::Vpn(_) | TunwardenError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
