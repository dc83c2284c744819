//! OpenVPN binary location
//!
//! Static path-probing routine: an environment override wins, then fixed
//! per-platform install locations in order, then a bare-name lookup via
//! the executable search path.

use crate::error::VpnError;
use std::path::PathBuf;

/// Environment variable overriding the binary location, read at
/// connect-time
pub const OPENVPN_BIN_ENV: &str = "OPENVPN_BIN";

#[cfg(target_os = "linux")]
const DEFAULT_LOCATIONS: &[&str] = &[
    "/usr/sbin/openvpn",
    "/usr/local/sbin/openvpn",
    "/usr/bin/openvpn",
];

#[cfg(target_os = "macos")]
const DEFAULT_LOCATIONS: &[&str] = &[
    "/usr/local/opt/openvpn/sbin/openvpn",
    "/opt/homebrew/opt/openvpn/sbin/openvpn",
    "/usr/local/sbin/openvpn",
];

#[cfg(target_os = "windows")]
const DEFAULT_LOCATIONS: &[&str] = &[
    r"C:\Program Files\OpenVPN\bin\openvpn.exe",
    r"C:\Program Files (x86)\OpenVPN\bin\openvpn.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const DEFAULT_LOCATIONS: &[&str] = &[];

/// Resolve the OpenVPN binary
///
/// An `OPENVPN_BIN` override is returned as-is without probing; a broken
/// override surfaces as a spawn failure instead of silently falling back.
pub fn locate_openvpn() -> Result<PathBuf, VpnError> {
    if let Ok(path) = std::env::var(OPENVPN_BIN_ENV) {
        return Ok(PathBuf::from(path));
    }

    for location in DEFAULT_LOCATIONS {
        let path = PathBuf::from(location);
        if path.exists() {
            return Ok(path);
        }
    }

    which::which("openvpn").map_err(|_| VpnError::BinaryNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        // Set/remove of a process-global var; fine for a single test
        std::env::set_var(OPENVPN_BIN_ENV, "/nonexistent/openvpn");
        let located = locate_openvpn();
        std::env::remove_var(OPENVPN_BIN_ENV);

        assert_eq!(located.unwrap(), PathBuf::from("/nonexistent/openvpn"));
    }
}
