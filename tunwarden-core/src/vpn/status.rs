//! Connection status state machine
//!
//! Holds the current status of one supervised session, applies transitions
//! emitted by the log line classifier and broadcasts every change to
//! subscribers in emission order.

use crate::vpn::classifier::{Guard, Transition};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Connection status of a supervised session
///
/// Exactly one status is active at any time. The status only changes as a
/// result of a classified log line or a lifecycle operation
/// (connect/disconnect/timeout); it never free-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Stopped,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Reconnecting,
    Error,
    Auth,
    AuthUsername,
    AuthPassword,
    AuthSuccess,
    AuthFailed,
}

impl Status {
    /// Stable string form, also used by the CLI and serde
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Stopped => "stopped",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnecting => "disconnecting",
            Status::Disconnected => "disconnected",
            Status::Reconnecting => "reconnecting",
            Status::Error => "error",
            Status::Auth => "auth",
            Status::AuthUsername => "auth_username",
            Status::AuthPassword => "auth_password",
            Status::AuthSuccess => "auth_success",
            Status::AuthFailed => "auth_failed",
        }
    }

    /// Statuses after which a session will not make further progress
    /// without a new `connect` call
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Disconnected | Status::Error | Status::AuthFailed
        )
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Stopped
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broadcast capacity for the status and log channels
///
/// Subscribers attached before `connect` see every transition as long as
/// they keep up; a full OpenVPN connect cycle emits far fewer events than
/// this.
const CHANNEL_CAPACITY: usize = 64;

/// State machine over [`Status`] with ordered, non-lossy subscription
/// delivery
///
/// Transitions are monotonically applied as received and never rolled
/// back. The machine does not validate that a transition is legal from
/// the current state; the classifier table encodes the few conditional
/// transitions as [`Guard`]s, which are resolved here against the current
/// status.
#[derive(Debug)]
pub struct StatusMachine {
    current: Mutex<Status>,
    status_tx: broadcast::Sender<Status>,
    log_tx: broadcast::Sender<String>,
}

impl StatusMachine {
    /// Create a machine in the `stopped` state
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (log_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            current: Mutex::new(Status::default()),
            status_tx,
            log_tx,
        }
    }

    /// Get the current status
    pub fn current(&self) -> Status {
        *self.current.lock().unwrap()
    }

    /// Subscribe to status changes, delivered in emission order
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.status_tx.subscribe()
    }

    /// Subscribe to the raw log line stream, delivered in arrival order
    pub fn subscribe_log(&self) -> broadcast::Receiver<String> {
        self.log_tx.subscribe()
    }

    /// Unconditionally transition to `status` and emit it
    ///
    /// Used by lifecycle operations (connect/disconnect/timeout) that
    /// drive the status directly rather than through the classifier.
    pub fn set(&self, status: Status) {
        {
            let mut current = self.current.lock().unwrap();
            *current = status;
        }
        // Send fails only when nobody subscribed, which is fine
        let _ = self.status_tx.send(status);
    }

    /// Apply a classified transition, resolving its guard against the
    /// current status
    ///
    /// Returns the new status if the transition applied, or `None` if the
    /// guard blocked it (in which case nothing is emitted).
    pub fn apply(&self, transition: &Transition) -> Option<Status> {
        {
            let mut current = self.current.lock().unwrap();
            match transition.guard {
                Guard::Always => {}
                Guard::NotAlready => {
                    if *current == transition.status {
                        return None;
                    }
                }
                Guard::OnlyFrom(required) => {
                    if *current != required {
                        return None;
                    }
                }
            }
            *current = transition.status;
        }
        let _ = self.status_tx.send(transition.status);
        Some(transition.status)
    }

    /// Forward a raw output line to log subscribers
    pub fn observe_line(&self, line: &str) {
        let _ = self.log_tx.send(line.to_string());
    }
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_is_stopped() {
        let machine = StatusMachine::new();
        assert_eq!(machine.current(), Status::Stopped);
    }

    #[test]
    fn test_set_emits_to_subscribers_in_order() {
        let machine = StatusMachine::new();
        let mut rx = machine.subscribe();

        machine.set(Status::Connecting);
        machine.set(Status::Connected);

        assert_eq!(rx.try_recv().unwrap(), Status::Connecting);
        assert_eq!(rx.try_recv().unwrap(), Status::Connected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(Status::Stopped.to_string(), "stopped");
        assert_eq!(Status::AuthUsername.to_string(), "auth_username");
        assert_eq!(Status::AuthFailed.to_string(), "auth_failed");
        assert_eq!(Status::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(Status::Disconnected.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(Status::AuthFailed.is_terminal());
        assert!(!Status::Connected.is_terminal());
        assert!(!Status::Stopped.is_terminal());
    }
}
