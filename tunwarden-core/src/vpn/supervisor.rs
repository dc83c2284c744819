//! OpenVPN process supervision
//!
//! One [`Session`] supervises one run of the OpenVPN client: it owns the
//! child process handle exclusively, wires process output through the
//! classifier into the status machine, answers credential prompts, and
//! enforces the connect/disconnect lifecycle with its timeouts.

use crate::config::SessionConfig;
use crate::error::{TunwardenError, VpnError};
use crate::vpn::artifacts;
use crate::vpn::auth::AuthResponder;
use crate::vpn::binary::locate_openvpn;
use crate::vpn::classifier::{classify, LineAssembler};
use crate::vpn::process::{
    find_matching, terminate_processes, ObservedProcess, ProcessList, SystemProcessList,
    OPENVPN_PROCESS_NAMES,
};
use crate::vpn::status::{Status, StatusMachine};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Deadline for a `connect` call to reach a terminal outcome
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default teardown budget for `disconnect`/`kill_processes`
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Wait after interrupting a held child before escalating
const GRACEFUL_WAIT: Duration = Duration::from_millis(500);

/// Terminator budget while clearing leftovers of a previous run
const BOOTSTRAP_TERMINATE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after teardown so OS-level interface cleanup can finish
const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// One supervised lifecycle of the OpenVPN client process
///
/// The session exclusively owns its child process handle; no other
/// component reads or writes the process's streams. Teardown is explicit:
/// call [`Session::disconnect`] (or at least [`Session::cleanup`]) when
/// done. Dropping a session without it leaks temp files and leaves the
/// child process running.
pub struct Session {
    config: SessionConfig,
    config_text: Option<String>,
    machine: Arc<StatusMachine>,
    responder: Arc<AuthResponder>,
    finder: Arc<dyn ProcessList>,
    child: Option<Child>,
    child_stdin: Arc<Mutex<Option<ChildStdin>>>,
    owned_config: Option<PathBuf>,
    owned_auth_file: Option<PathBuf>,
}

impl Session {
    /// Create a session for an existing OpenVPN configuration file
    pub fn new(config: SessionConfig) -> Result<Self, TunwardenError> {
        Self::build(config, None)
    }

    /// Create a session from raw configuration text
    ///
    /// The text is materialized to a temp file the session owns and
    /// deletes on teardown; `base` supplies credentials and extra flags,
    /// its `config` path is ignored.
    pub fn from_config_text(contents: &str, base: SessionConfig) -> Result<Self, TunwardenError> {
        Self::build(base, Some(contents.to_string()))
    }

    fn build(config: SessionConfig, config_text: Option<String>) -> Result<Self, TunwardenError> {
        if config_text.is_none() {
            config.validate().map_err(|message| {
                TunwardenError::Config(crate::error::ConfigError::ValidationError { message })
            })?;
        }

        let responder = AuthResponder::new(config.username.clone(), config.password.clone());

        Ok(Self {
            config,
            config_text,
            machine: Arc::new(StatusMachine::new()),
            responder: Arc::new(responder),
            finder: Arc::new(SystemProcessList),
            child: None,
            child_stdin: Arc::new(Mutex::new(None)),
            owned_config: None,
            owned_auth_file: None,
        })
    }

    /// Substitute the process-listing service (used by tests)
    pub fn with_process_list(mut self, finder: Arc<dyn ProcessList>) -> Self {
        self.finder = finder;
        self
    }

    /// Current connection status
    pub fn status(&self) -> Status {
        self.machine.current()
    }

    /// Subscribe to status changes, delivered in emission order
    pub fn subscribe_status(&self) -> broadcast::Receiver<Status> {
        self.machine.subscribe()
    }

    /// Subscribe to raw process output lines, delivered in arrival order
    pub fn subscribe_log(&self) -> broadcast::Receiver<String> {
        self.machine.subscribe_log()
    }

    /// Live OS processes matching the known OpenVPN executable names
    pub fn get_processes(&self) -> Vec<ObservedProcess> {
        find_matching(self.finder.as_ref(), OPENVPN_PROCESS_NAMES)
    }

    /// Terminate every matching OpenVPN process outside the normal
    /// lifecycle
    pub async fn kill_processes(&self, graceful: bool, timeout: Duration) {
        let matching = self.get_processes();
        terminate_processes(self.finder.as_ref(), &matching, graceful, timeout).await;
    }

    /// Connect: spawn the OpenVPN process and wait for it to come up
    ///
    /// Resolves as soon as the status becomes `connected`; fails on
    /// `error` or `auth_failed`, or with a timeout error after 30 s (in
    /// which case the half-started process is torn down again).
    pub async fn connect(&mut self) -> Result<(), TunwardenError> {
        let mut rx = self.machine.subscribe();

        self.bootstrap().await;
        self.machine.set(Status::Connecting);

        let binary = match locate_openvpn() {
            Ok(binary) => binary,
            Err(e) => {
                self.machine.observe_line(&e.to_string());
                self.machine.set(Status::Error);
                return Err(e.into());
            }
        };

        let config_path = match self.prepare_artifacts() {
            Ok(path) => path,
            Err(e) => {
                self.machine.observe_line(&e.to_string());
                self.machine.set(Status::Error);
                return Err(e.into());
            }
        };

        let mut command = Command::new(&binary);
        command.arg("--config").arg(&config_path);
        if let Some(auth_file) = &self.owned_auth_file {
            command.arg("--auth-user-pass").arg(auth_file);
        }
        // Caller-supplied flags go last, verbatim
        command.args(&self.config.extra_args);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let reason = format!("{}: {}", binary.display(), e);
                self.machine.observe_line(&reason);
                self.machine.set(Status::Error);
                return Err(VpnError::Spawn { reason }.into());
            }
        };
        debug!("Spawned {} with pid {:?}", binary.display(), child.id());

        {
            let mut stdin = self.child_stdin.lock().await;
            *stdin = child.stdin.take();
        }
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_stream(
                stdout,
                Arc::clone(&self.machine),
                Arc::clone(&self.responder),
                Arc::clone(&self.child_stdin),
                true,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_stream(
                stderr,
                Arc::clone(&self.machine),
                Arc::clone(&self.responder),
                Arc::clone(&self.child_stdin),
                false,
            ));
        }
        self.child = Some(child);

        let raced = timeout(CONNECT_TIMEOUT, async {
            loop {
                match rx.recv().await {
                    Ok(Status::Connected) => break Ok(()),
                    Ok(Status::AuthFailed) => break Err(VpnError::AuthenticationFailed),
                    Ok(Status::Error) => {
                        break Err(VpnError::ConnectionFailed {
                            reason: "process reported an error".to_string(),
                        })
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        break Err(VpnError::ConnectionFailed {
                            reason: "status stream closed".to_string(),
                        })
                    }
                }
            }
        })
        .await;

        match raced {
            Ok(Ok(())) => {
                info!("VPN connection established");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(
                    "No terminal status within {}s, tearing down",
                    CONNECT_TIMEOUT.as_secs()
                );
                self.disconnect(true, DEFAULT_DISCONNECT_TIMEOUT).await;
                Err(VpnError::ConnectTimeout {
                    seconds: CONNECT_TIMEOUT.as_secs(),
                }
                .into())
            }
        }
    }

    /// Disconnect: tear the process down and clean up
    ///
    /// Never fails; termination and cleanup failures are reported through
    /// the log stream only. Returns after a short settle delay once the
    /// process and owned artifacts are gone (or every removal has been
    /// attempted).
    pub async fn disconnect(&mut self, graceful: bool, timeout: Duration) {
        let current = self.machine.current();
        if !matches!(
            current,
            Status::Disconnected | Status::Stopped | Status::Disconnecting
        ) {
            self.machine.set(Status::Disconnecting);
        }

        if let Some(child) = &self.child {
            if graceful {
                if let Some(pid) = child.id() {
                    debug!("Sending SIGINT to child {}", pid);
                    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
                }
                sleep(GRACEFUL_WAIT.min(timeout / 2)).await;
            }
        }

        let matching = find_matching(self.finder.as_ref(), OPENVPN_PROCESS_NAMES);
        terminate_processes(self.finder.as_ref(), &matching, graceful, timeout).await;

        if let Some(mut child) = self.child.take() {
            // Reap our own child; bounded in case the kill did not land
            let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
        }
        {
            let mut stdin = self.child_stdin.lock().await;
            *stdin = None;
        }

        let current = self.machine.current();
        if current != Status::Stopped && !current.is_terminal() {
            self.machine.set(Status::Disconnected);
        }

        self.cleanup();
        sleep(SETTLE_DELAY).await;
    }

    /// Remove owned temp artifacts; idempotent and best-effort
    pub fn cleanup(&mut self) {
        if let Some(path) = self.owned_config.take() {
            artifacts::remove_artifact(&path);
        }
        if let Some(path) = self.owned_auth_file.take() {
            artifacts::remove_artifact(&path);
        }
    }

    /// Clear any remains of a previous run so connect starts from a
    /// clean slate
    async fn bootstrap(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Some(pid) = child.id() {
                debug!("Discarding previous child {}", pid);
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
            }
            sleep(GRACEFUL_WAIT).await;
            let _ = child.start_kill();
            let _ = child.wait().await;

            let leftovers = find_matching(self.finder.as_ref(), OPENVPN_PROCESS_NAMES);
            terminate_processes(
                self.finder.as_ref(),
                &leftovers,
                true,
                BOOTSTRAP_TERMINATE_TIMEOUT,
            )
            .await;
        }

        {
            let mut stdin = self.child_stdin.lock().await;
            *stdin = None;
        }

        // A previous credential file is stale once we reconnect
        if let Some(path) = self.owned_auth_file.take() {
            artifacts::remove_artifact(&path);
        }
    }

    /// Materialize text-supplied config and the auth file; returns the
    /// config path to launch with
    fn prepare_artifacts(&mut self) -> Result<PathBuf, VpnError> {
        if self.config_text.is_some() && self.owned_config.is_none() {
            let contents = self.config_text.as_deref().unwrap_or_default();
            let path = artifacts::materialize_config(contents).map_err(|e| VpnError::Spawn {
                reason: format!("failed to materialize config: {}", e),
            })?;
            self.owned_config = Some(path);
        }

        if self.config.auth_via_file {
            let (username, password) = match (&self.config.username, &self.config.password) {
                (Some(username), Some(password)) => (username.clone(), password.clone()),
                _ => {
                    return Err(VpnError::Spawn {
                        reason: "auth file delivery configured without credentials".to_string(),
                    })
                }
            };
            let path =
                artifacts::write_auth_file(&username, &password).map_err(|e| VpnError::Spawn {
                    reason: format!("failed to write auth file: {}", e),
                })?;
            self.owned_auth_file = Some(path);
        }

        Ok(self
            .owned_config
            .clone()
            .unwrap_or_else(|| self.config.config.clone()))
    }
}

/// Pump one output stream: split chunks into lines, forward every line to
/// the log stream and classified transitions into the status machine
///
/// Only the stdout pump flags process exit; treating both streams' EOF as
/// exit would double-fire the transition.
async fn pump_stream<R>(
    mut reader: R,
    machine: Arc<StatusMachine>,
    responder: Arc<AuthResponder>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    detect_exit: bool,
) where
    R: AsyncRead + Unpin,
{
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 4096];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                for line in assembler.push(&chunk) {
                    handle_line(&line, &machine, &responder, &stdin).await;
                }
            }
        }
    }

    // Trailing unterminated output is observable but never classified
    if let Some(rest) = assembler.finish() {
        machine.observe_line(&rest);
    }

    if detect_exit && !machine.current().is_terminal() {
        debug!("Process output ended with status {}", machine.current());
        machine.set(Status::Disconnected);
    }
}

async fn handle_line(
    line: &str,
    machine: &StatusMachine,
    responder: &AuthResponder,
    stdin: &Mutex<Option<ChildStdin>>,
) {
    machine.observe_line(line);

    let Some(transition) = classify(line) else {
        return;
    };
    let Some(status) = machine.apply(transition) else {
        return;
    };
    debug!("Status -> {}", status);

    let Some(prompt) = transition.prompt else {
        return;
    };
    let mut guard = stdin.lock().await;
    match guard.as_mut() {
        Some(writer) => match responder.respond(prompt, writer).await {
            Ok(true) => debug!("Answered {:?} prompt", prompt),
            Ok(false) => {
                debug!("No credential configured for {:?} prompt", prompt);
                machine.set(Status::AuthFailed);
            }
            Err(e) => warn!("Failed to write credential: {}", e),
        },
        None => {
            warn!("Auth prompt with no process stdin available");
            machine.set(Status::AuthFailed);
        }
    }
}
