//! Pattern-based classifier for OpenVPN CLI output
//!
//! Maps raw log lines onto status transitions using an ordered table of
//! case-sensitive substring patterns. The table is immutable process-wide
//! configuration; earlier entries win when a line matches more than one
//! pattern.

use crate::vpn::status::Status;

/// Credential prompt kinds the auth responder must answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPrompt {
    Username,
    Password,
}

/// Condition under which a matched transition applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Apply unconditionally
    Always,
    /// Apply only when the current status differs from the target
    NotAlready,
    /// Apply only when the current status is exactly this one
    OnlyFrom(Status),
}

/// A status transition extracted from one log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status to transition to, subject to `guard`
    pub status: Status,
    /// Guard resolved by the state machine against the current status
    pub guard: Guard,
    /// Credential prompt to answer as a side effect
    pub prompt: Option<AuthPrompt>,
}

impl Transition {
    const fn to(status: Status) -> Self {
        Self {
            status,
            guard: Guard::Always,
            prompt: None,
        }
    }

    const fn guarded(status: Status, guard: Guard) -> Self {
        Self {
            status,
            guard,
            prompt: None,
        }
    }

    const fn prompting(status: Status, prompt: AuthPrompt) -> Self {
        Self {
            status,
            guard: Guard::Always,
            prompt: Some(prompt),
        }
    }
}

/// Ordered pattern table; insertion order is priority order
const PATTERNS: &[(&str, Transition)] = &[
    (
        "Initialization Sequence Completed",
        Transition::to(Status::Connected),
    ),
    (
        "PUSH: Received control message",
        Transition::guarded(Status::Connected, Guard::NotAlready),
    ),
    ("Exiting", Transition::to(Status::Disconnected)),
    (
        "Enter Auth Username:",
        Transition::prompting(Status::AuthUsername, AuthPrompt::Username),
    ),
    (
        "Enter Auth Password:",
        Transition::prompting(Status::AuthPassword, AuthPrompt::Password),
    ),
    ("Verification Failed", Transition::to(Status::AuthFailed)),
    ("AUTH_FAILED", Transition::to(Status::AuthFailed)),
    (
        "Peer Connection Initiated",
        Transition::to(Status::AuthSuccess),
    ),
    (
        "SIGUSR1[soft,ping-restart] received, process restarting",
        Transition::to(Status::Reconnecting),
    ),
    (
        "Successful ARP Flush on interface",
        Transition::guarded(Status::Connected, Guard::OnlyFrom(Status::Reconnecting)),
    ),
];

/// Classify one complete log line
///
/// Pure and deterministic: applies the pattern table top to bottom and
/// returns the transition for the first substring match, or `None` when
/// no pattern matches. Callers forward the line verbatim to the log
/// stream regardless of the result.
pub fn classify(line: &str) -> Option<&'static Transition> {
    PATTERNS
        .iter()
        .find(|(pattern, _)| line.contains(pattern))
        .map(|(_, transition)| transition)
}

/// Assembles complete lines out of raw output chunks
///
/// A single chunk may contain multiple lines as well as a trailing
/// partial line split across chunk boundaries. Lines terminate on `\r\n`
/// or `\n`; empty lines are discarded, and a partial line is never
/// surfaced until its terminator arrives.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the complete lines it finished
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buf.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let mut line: String = self.buf.drain(..=pos).collect();
            line.pop(); // the '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Drain any unterminated trailing content, for end-of-stream
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        // A line matching both the PUSH pattern and "Exiting" resolves to
        // the earlier table entry
        let line = "PUSH: Received control message, Exiting soon";
        let transition = classify(line).unwrap();
        assert_eq!(transition.status, Status::Connected);
        assert_eq!(transition.guard, Guard::NotAlready);
    }

    #[test]
    fn test_substring_match_is_case_sensitive() {
        assert!(classify("initialization sequence completed").is_none());
        assert!(classify("Initialization Sequence Completed").is_some());
    }

    #[test]
    fn test_assembler_buffers_partial_lines() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push("Initialization Seq").is_empty());
        let lines = assembler.push("uence Completed\n");
        assert_eq!(lines, vec!["Initialization Sequence Completed"]);
    }

    #[test]
    fn test_assembler_splits_crlf_and_drops_empties() {
        let mut assembler = LineAssembler::new();
        let lines = assembler.push("one\r\n\r\ntwo\nthree");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(assembler.finish(), Some("three".to_string()));
        assert_eq!(assembler.finish(), None);
    }
}
