// Tests for process enumeration and the escalating terminator

#![cfg(unix)]

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tunwarden_core::vpn::process::terminate_processes;
use tunwarden_core::vpn::{ObservedProcess, ProcessList, SystemProcessList};

/// Finder that always reports the given targets as live; forces the
/// terminator to run out its polling budget and escalate
struct AlwaysAlive(Vec<ObservedProcess>);

impl ProcessList for AlwaysAlive {
    fn list(&self) -> Vec<ObservedProcess> {
        self.0.clone()
    }
}

/// Spawn a process that ignores SIGINT (the disposition survives exec)
fn spawn_stubborn() -> std::process::Child {
    Command::new("sh")
        .args(["-c", "trap '' INT; exec sleep 3600"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn stubborn process")
}

fn spawn_cooperative() -> std::process::Child {
    Command::new("sleep")
        .arg("3600")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn mock process")
}

fn observed(child: &std::process::Child, name: &str) -> ObservedProcess {
    ObservedProcess {
        pid: child.id(),
        name: name.to_string(),
    }
}

#[test]
fn test_system_process_list_contains_this_process() {
    let finder = SystemProcessList;
    let list = finder.list();

    assert!(!list.is_empty());
    let own_pid = std::process::id();
    assert!(list.iter().any(|p| p.pid == own_pid));
}

#[tokio::test]
async fn test_cooperative_processes_die_from_the_interrupt() {
    let mut child = spawn_cooperative();
    let targets = vec![observed(&child, "openvpn")];
    let finder = AlwaysAlive(targets.clone());

    terminate_processes(&finder, &targets, true, Duration::from_secs(1)).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = child.try_wait().expect("try_wait failed");
    assert!(status.is_some(), "process should be gone after SIGINT");
}

#[tokio::test]
async fn test_stubborn_processes_get_forceful_kill_after_timeout() {
    let mut first = spawn_stubborn();
    let mut second = spawn_stubborn();
    let targets = vec![observed(&first, "openvpn"), observed(&second, "openvpn")];
    let finder = AlwaysAlive(targets.clone());

    let started = Instant::now();
    terminate_processes(&finder, &targets, true, Duration::from_secs(1)).await;
    let elapsed = started.elapsed();

    // The graceful phase polls out its full budget before escalating
    assert!(elapsed >= Duration::from_secs(1), "escalated too early");
    assert!(elapsed < Duration::from_secs(3), "escalation took too long");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(first.try_wait().unwrap().is_some(), "first survived SIGKILL");
    assert!(
        second.try_wait().unwrap().is_some(),
        "second survived SIGKILL"
    );
}
