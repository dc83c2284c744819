//! Status reporting from the process table and interface list

use colored::Colorize;
use serde::Serialize;
use tunwarden_core::error::TunwardenError;
use tunwarden_core::vpn::netwatch;
use tunwarden_core::vpn::process::find_matching;
use tunwarden_core::vpn::{ObservedProcess, SystemProcessList, OPENVPN_PROCESS_NAMES};

#[derive(Serialize)]
struct StatusReport {
    running: bool,
    processes: Vec<ObservedProcess>,
    vpn_interfaces: Vec<String>,
}

/// Run the status command
pub fn run_status(json: bool) -> Result<(), TunwardenError> {
    let finder = SystemProcessList;
    let processes = find_matching(&finder, OPENVPN_PROCESS_NAMES);
    let vpn_interfaces = netwatch::vpn_interfaces();

    if json {
        let report = StatusReport {
            running: !processes.is_empty(),
            processes,
            vpn_interfaces,
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        println!("{}", rendered);
        return Ok(());
    }

    if processes.is_empty() {
        println!("OpenVPN: {}", "not running".red());
    } else {
        println!("OpenVPN: {}", "running".green());
        for process in &processes {
            println!("  {} (pid {})", process.name, process.pid);
        }
    }

    if vpn_interfaces.is_empty() {
        println!("VPN interfaces: {}", "none".dimmed());
    } else {
        let joined = vpn_interfaces.join(", ");
        println!("VPN interfaces: {}", joined.as_str().green());
    }

    Ok(())
}

/// Run the ps command
pub fn run_ps() -> Result<(), TunwardenError> {
    let finder = SystemProcessList;
    let processes = find_matching(&finder, OPENVPN_PROCESS_NAMES);

    if processes.is_empty() {
        println!("No matching processes");
        return Ok(());
    }

    for process in &processes {
        println!("{}\t{}", process.pid, process.name);
    }

    Ok(())
}
