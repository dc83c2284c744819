//! Stand-alone teardown of running OpenVPN processes

use colored::Colorize;
use std::time::Duration;
use tunwarden_core::error::TunwardenError;
use tunwarden_core::vpn::process::{find_matching, terminate_processes};
use tunwarden_core::vpn::{SystemProcessList, OPENVPN_PROCESS_NAMES};

/// Run the disconnect command
pub async fn run_disconnect(force: bool, timeout_ms: u64) -> Result<(), TunwardenError> {
    let finder = SystemProcessList;
    let matching = find_matching(&finder, OPENVPN_PROCESS_NAMES);

    if matching.is_empty() {
        println!("No OpenVPN processes running");
        return Ok(());
    }

    for process in &matching {
        println!("Terminating {} (pid {})", process.name, process.pid);
    }

    terminate_processes(
        &finder,
        &matching,
        !force,
        Duration::from_millis(timeout_ms),
    )
    .await;

    let remaining = find_matching(&finder, OPENVPN_PROCESS_NAMES);
    if remaining.is_empty() {
        println!("{}", "All OpenVPN processes terminated".green());
    } else {
        let warning = format!(
            "{} process(es) still listed after kill attempt",
            remaining.len()
        );
        println!("{}", warning.as_str().yellow());
    }

    Ok(())
}
