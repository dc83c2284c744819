//! Process enumeration and escalating termination
//!
//! Finds running OpenVPN processes by executable name and tears them down
//! with a graceful-then-forceful protocol. Termination is best-effort
//! throughout: signal failures are swallowed so teardown can never block
//! on an unkillable process.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use std::time::Duration;
use sysinfo::System;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Executable names of the supervised binary across platforms
pub const OPENVPN_PROCESS_NAMES: &[&str] = &["openvpn", "openvpn.exe"];

/// Polling interval while waiting for gracefully signalled processes to
/// exit
pub const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One live OS process matching a known executable name
///
/// Transient: recomputed on every query, never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedProcess {
    pub pid: u32,
    pub name: String,
}

/// External process-listing service
///
/// The OS process table is shared mutable state across concurrent
/// sessions; modelling it as an explicit interface keeps that sharing
/// visible to callers and lets tests substitute a fixed listing.
pub trait ProcessList: Send + Sync {
    /// Every currently running process as `{pid, name}`
    ///
    /// No ordering guarantee beyond "contains every live match".
    fn list(&self) -> Vec<ObservedProcess>;
}

/// [`ProcessList`] backed by the OS process table
#[derive(Debug, Default)]
pub struct SystemProcessList;

impl ProcessList for SystemProcessList {
    fn list(&self) -> Vec<ObservedProcess> {
        let mut system = System::new();
        system.refresh_processes();
        system
            .processes()
            .iter()
            .map(|(pid, process)| ObservedProcess {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect()
    }
}

/// Filter the live process list down to known executable names
pub fn find_matching(finder: &dyn ProcessList, names: &[&str]) -> Vec<ObservedProcess> {
    finder
        .list()
        .into_iter()
        .filter(|process| names.iter().any(|name| process.name.eq_ignore_ascii_case(name)))
        .collect()
}

/// Best-effort signal delivery; failures are logged, never propagated
fn send_signal(pid: u32, signal: Signal) -> bool {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => true,
        Err(e) => {
            debug!("Failed to send {} to pid {}: {}", signal, pid, e);
            false
        }
    }
}

/// Which of `targets` the finder still reports as live
fn still_alive(finder: &dyn ProcessList, targets: &[ObservedProcess]) -> Vec<ObservedProcess> {
    let live = finder.list();
    targets
        .iter()
        .filter(|target| live.iter().any(|p| p.pid == target.pid && p.name == target.name))
        .cloned()
        .collect()
}

/// Terminate `targets`, gracefully first when requested
///
/// With `graceful`, every target receives SIGINT, then the process list
/// is polled every 500 ms until the timeout elapses or no target remains.
/// Survivors receive SIGKILL; if any kill fails the whole batch is killed
/// once more after a short wait. On return either no target remains or
/// every remaining one has had a forceful kill attempt; callers cannot
/// distinguish the two except by re-querying.
pub async fn terminate_processes(
    finder: &dyn ProcessList,
    targets: &[ObservedProcess],
    graceful: bool,
    timeout: Duration,
) {
    if targets.is_empty() {
        return;
    }

    if graceful {
        for target in targets {
            debug!("Sending SIGINT to {} ({})", target.pid, target.name);
            send_signal(target.pid, Signal::SIGINT);
        }

        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if still_alive(finder, targets).is_empty() {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(TERMINATE_POLL_INTERVAL.min(remaining)).await;
        }
    }

    let survivors = still_alive(finder, targets);
    if survivors.is_empty() {
        return;
    }

    let mut kill_failed = false;
    for survivor in &survivors {
        warn!("Forcefully killing {} ({})", survivor.pid, survivor.name);
        if !send_signal(survivor.pid, Signal::SIGKILL) {
            kill_failed = true;
        }
    }

    if kill_failed {
        sleep(TERMINATE_POLL_INTERVAL).await;
        for survivor in &survivors {
            send_signal(survivor.pid, Signal::SIGKILL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProcessList(Vec<ObservedProcess>);

    impl ProcessList for FixedProcessList {
        fn list(&self) -> Vec<ObservedProcess> {
            self.0.clone()
        }
    }

    #[test]
    fn test_find_matching_filters_by_known_names() {
        let finder = FixedProcessList(vec![
            ObservedProcess {
                pid: 100,
                name: "openvpn".to_string(),
            },
            ObservedProcess {
                pid: 200,
                name: "bash".to_string(),
            },
            ObservedProcess {
                pid: 300,
                name: "OpenVPN.exe".to_string(),
            },
        ]);

        let matched = find_matching(&finder, OPENVPN_PROCESS_NAMES);
        let pids: Vec<u32> = matched.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![100, 300]);
    }

    #[tokio::test]
    async fn test_terminate_with_no_targets_returns_immediately() {
        let finder = FixedProcessList(vec![]);
        let started = std::time::Instant::now();
        terminate_processes(&finder, &[], true, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_terminate_nonexistent_pid_is_swallowed() {
        let target = ObservedProcess {
            pid: 0x7fff_fff0,
            name: "openvpn".to_string(),
        };
        // Finder never reports the target as live, so no kill escalation
        let finder = FixedProcessList(vec![]);
        terminate_processes(&finder, &[target], true, Duration::from_millis(600)).await;
    }
}
