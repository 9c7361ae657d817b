use edge_uv_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

/// Split `host:port` into its host and numeric port.
///
/// The host may be empty (`":8080"`) and may be a bracketed IPv6 literal
/// (`"[::1]:8080"`), in which case the brackets are stripped.
pub fn split_host_port(hostport: &str) -> Result<(&str, u16)> {
    let Some(i) = hostport.rfind(':') else {
        return Err(Error::InvalidAddress(format!(
            "{hostport} missing port in address"
        )));
    };
    let (host, port) = (&hostport[..i], &hostport[i + 1..]);
    let host = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(v6) => v6,
        None if host.contains(':') => {
            return Err(Error::InvalidAddress(format!(
                "{hostport} too many colons in address"
            )))
        }
        None => host,
    };
    let port = port
        .parse::<u16>()
        .map_err(|e| Error::InvalidAddress(format!("{hostport} invalid port: {e}")))?;
    Ok((host, port))
}

/// Resolve `host:port` to the address a listener binds.
///
/// An empty host means every IPv4 interface. Hostnames go through the system
/// resolver and the first address wins.
pub fn resolve(hostport: &str) -> Result<SocketAddr> {
    let (host, port) = split_host_port(hostport)?;
    if host.is_empty() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::InvalidAddress(format!("{hostport}: {e}")))?
        .next()
        .ok_or_else(|| Error::InvalidAddress(format!("{hostport} resolved to nothing")))
}
