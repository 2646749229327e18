//! Host address parsing
//!
//! Turns `"<ip>:<port>"` strings into socket addresses. When the string holds
//! more than one colon, everything before the last colon is the IP, so bare
//! IPv6 addresses such as `::1:7777` work without brackets.

use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, TransportError};

/// Parse a host address of the form `127.0.0.1:7777`
///
/// IPv6 addresses may be written bare (`::1:7777`) or bracketed (`[::1]:7777`).
pub fn parse_host_address(host_address: &str) -> Result<SocketAddr> {
    let invalid = || TransportError::InvalidAddress(host_address.to_string());

    let (ip_str, port_str) = host_address.rsplit_once(':').ok_or_else(invalid)?;

    let ip_str = ip_str
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(ip_str);

    let ip: IpAddr = ip_str.parse().map_err(|_| invalid())?;
    let port: u16 = port_str.parse().map_err(|_| invalid())?;

    Ok(SocketAddr::new(ip, port))
}
