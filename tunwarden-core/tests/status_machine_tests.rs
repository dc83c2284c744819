// Unit tests for the status state machine and its interplay with the
// classifier table

use tunwarden_core::vpn::{classify, Status, StatusMachine};

/// Feed a raw line through classify + apply, returning the new status if
/// a transition applied
fn feed(machine: &StatusMachine, line: &str) -> Option<Status> {
    classify(line).and_then(|transition| machine.apply(transition))
}

#[test]
fn test_unmatched_line_leaves_status_unchanged() {
    let machine = StatusMachine::new();
    machine.set(Status::Connecting);

    assert_eq!(feed(&machine, "TUN/TAP device tun0 opened"), None);
    assert_eq!(machine.current(), Status::Connecting);
}

#[test]
fn test_push_message_is_idempotent_once_connected() {
    let machine = StatusMachine::new();
    machine.set(Status::Connecting);
    let mut rx = machine.subscribe();

    let line = "PUSH: Received control message: 'PUSH_REPLY'";
    assert_eq!(feed(&machine, line), Some(Status::Connected));
    // Second occurrence must not re-emit connected
    assert_eq!(feed(&machine, line), None);
    assert_eq!(machine.current(), Status::Connected);

    assert_eq!(rx.try_recv().unwrap(), Status::Connected);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_arp_flush_connects_only_from_reconnecting() {
    let machine = StatusMachine::new();
    let line = "Successful ARP Flush on interface [5] {9A32F8}";

    for status in [
        Status::Stopped,
        Status::Connecting,
        Status::Connected,
        Status::Disconnected,
    ] {
        machine.set(status);
        assert_eq!(feed(&machine, line), None, "applied from {:?}", status);
        assert_eq!(machine.current(), status);
    }

    machine.set(Status::Reconnecting);
    assert_eq!(feed(&machine, line), Some(Status::Connected));
}

#[test]
fn test_reconnect_cycle_status_history() {
    let machine = StatusMachine::new();
    let mut rx = machine.subscribe();

    machine.set(Status::Connecting);
    feed(&machine, "Initialization Sequence Completed");
    feed(&machine, "SIGUSR1[soft,ping-restart] received, process restarting");
    feed(&machine, "Successful ARP Flush on interface [5] {9A32F8}");
    feed(&machine, "SIGINT[hard,] received, process Exiting");

    let mut history = Vec::new();
    while let Ok(status) = rx.try_recv() {
        history.push(status);
    }
    assert_eq!(
        history,
        vec![
            Status::Connecting,
            Status::Connected,
            Status::Reconnecting,
            Status::Connected,
            Status::Disconnected,
        ]
    );
}

#[test]
fn test_auth_flow_status_history() {
    let machine = StatusMachine::new();

    assert_eq!(
        feed(&machine, "2024-01-01 Enter Auth Username:"),
        Some(Status::AuthUsername)
    );
    assert_eq!(
        feed(&machine, "2024-01-01 Enter Auth Password:"),
        Some(Status::AuthPassword)
    );
    assert_eq!(
        feed(&machine, "[server] Peer Connection Initiated with [AF_INET]203.0.113.1:1194"),
        Some(Status::AuthSuccess)
    );
}

#[test]
fn test_log_stream_receives_every_line_in_order() {
    let machine = StatusMachine::new();
    let mut rx = machine.subscribe_log();

    machine.observe_line("first");
    machine.observe_line("second");

    assert_eq!(rx.try_recv().unwrap(), "first");
    assert_eq!(rx.try_recv().unwrap(), "second");
}

#[test]
fn test_late_subscriber_misses_earlier_transitions() {
    // Subscribers are expected to attach before connect; this documents
    // the tradeoff for late ones
    let machine = StatusMachine::new();
    machine.set(Status::Connecting);

    let mut rx = machine.subscribe();
    machine.set(Status::Connected);

    assert_eq!(rx.try_recv().unwrap(), Status::Connected);
    assert!(rx.try_recv().is_err());
}
