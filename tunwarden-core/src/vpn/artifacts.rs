//! Temporary launch artifacts
//!
//! Materializes string-supplied configuration and the generated
//! `--auth-user-pass` credential file into the temp directory, and removes
//! them again on teardown. Removal is best-effort and idempotent; callers
//! must invoke explicit cleanup, since nothing here is deleted by a
//! destructor and skipping cleanup leaks the files.

use crate::config::Password;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Write raw configuration text to a temp `.ovpn` file
///
/// The returned path is owned by the session and must be removed via
/// [`remove_artifact`].
pub fn materialize_config(contents: &str) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("tunwarden-")
        .suffix(".ovpn")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    persist(file)
}

/// Write a generated auth file: username line, password line
///
/// Mode 0600 on unix; OpenVPN refuses group/world-readable credential
/// files depending on build options, and there is no reason to be looser.
pub fn write_auth_file(username: &str, password: &Password) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("tunwarden-auth-")
        .tempfile()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", username)?;
    writeln!(file, "{}", password.expose())?;
    persist(file)
}

fn persist(file: tempfile::NamedTempFile) -> std::io::Result<PathBuf> {
    let (file, path) = file.keep().map_err(|e| e.error)?;
    file.sync_all()?;
    Ok(path)
}

/// Best-effort removal of an owned artifact
///
/// Missing files are fine (idempotent); other failures are logged and
/// swallowed so teardown always completes.
pub fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
