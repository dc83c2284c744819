//! VPN interface detection heuristic
//!
//! Side channel independent of the supervised process: inspects the OS
//! network interface list for names that look like VPN tunnels. Consumed
//! by status reporting only; the supervisor's state machine never reads
//! this.

use sysinfo::Networks;

/// Interface name prefixes that indicate a VPN-like tunnel
pub const VPN_INTERFACE_PREFIXES: &[&str] = &["tun", "tap", "utun", "wg", "ppp"];

/// Whether an interface name looks like a VPN tunnel (`tun0`, `utun3`,
/// `wg0`, ...)
pub fn is_vpn_interface(name: &str) -> bool {
    VPN_INTERFACE_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
    })
}

/// Names of currently present VPN-like interfaces
pub fn vpn_interfaces() -> Vec<String> {
    let networks = Networks::new_with_refreshed_list();
    networks
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| is_vpn_interface(name))
        .collect()
}

/// Whether any VPN-like interface is currently present
pub fn vpn_interface_present() -> bool {
    !vpn_interfaces().is_empty()
}
