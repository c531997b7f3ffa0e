//! Device session capability consumed by the poller.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tsm_core::Snapshot;

use crate::error::SessionError;

/// Port used when the device address carries none.
pub const DEFAULT_PORT: u16 = 161;

/// Where and how to reach the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    /// Resolved device address.
    pub addr: SocketAddr,
    /// Read community.
    pub community: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SessionTarget {
    /// Resolves `HOST` or `HOST:PORT` to the first address it names.
    pub async fn resolve(raw: &str, community: &str, timeout: Duration) -> std::io::Result<Self> {
        let hostport = with_default_port(raw);
        let addr = tokio::net::lookup_host(hostport.as_str())
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address found for {raw}"),
                )
            })?;
        Ok(Self {
            addr,
            community: community.to_string(),
            timeout,
        })
    }
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

fn with_default_port(raw: &str) -> String {
    if raw.parse::<SocketAddr>().is_ok() {
        return raw.to_string();
    }
    match raw.parse::<std::net::Ipv6Addr>() {
        Ok(ip) => SocketAddr::from((ip, DEFAULT_PORT)).to_string(),
        Err(_) if raw.contains(':') => raw.to_string(),
        Err(_) => format!("{raw}:{DEFAULT_PORT}"),
    }
}

/// Request/response client for one device.
///
/// Implementations serialize their own I/O; the poller never issues two
/// queries at once, but identification and sampling share one session.
#[async_trait]
pub trait DeviceSession: Send + Sync + 'static {
    /// Opens the transport.
    async fn connect(&self, target: &SessionTarget) -> Result<(), SessionError>;

    /// Whether `connect` succeeded and `close` has not been called since.
    fn is_connected(&self) -> bool;

    /// Fetches the current values of `oids`, stamped with the answer time.
    async fn query(&self, oids: &[String]) -> Result<Snapshot, SessionError>;

    /// Drops the transport. Closing an unconnected session is a no-op.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_appended() {
        assert_eq!(with_default_port("10.0.0.5"), "10.0.0.5:161");
        assert_eq!(with_default_port("10.0.0.5:1161"), "10.0.0.5:1161");
        assert_eq!(with_default_port("ups.example.org"), "ups.example.org:161");
        assert_eq!(with_default_port("ups.example.org:16100"), "ups.example.org:16100");
        assert_eq!(with_default_port("::1"), "[::1]:161");
        assert_eq!(with_default_port("[::1]:162"), "[::1]:162");
    }

    #[tokio::test]
    async fn resolve_literal_address() {
        let t = SessionTarget::resolve("127.0.0.1", "public", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(t.addr, "127.0.0.1:161".parse().unwrap());
        assert_eq!(t.to_string(), "127.0.0.1:161");
    }
}
