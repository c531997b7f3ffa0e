//! SNMPv2c device session over UDP.
//!
//! Each query issues one GET per identifier on a blocking socket, run on
//! tokio's blocking pool. `snmp::SyncSession::get` carries a single varbind
//! and its only multi-name request is GETBULK, which returns the successor
//! of each name rather than the name itself. A snapshot therefore costs one
//! round trip per identifier and is stamped after the last answer.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use snmp::{SyncSession, Value};
use tracing::debug;
use tsm_core::Snapshot;

use crate::error::SessionError;
use crate::session::{DeviceSession, SessionTarget};

/// Rendering of "object not present on this device".
const ABSENT: &str = "0";

/// SNMP-backed [`DeviceSession`].
#[derive(Default)]
pub struct SnmpSession {
    inner: Arc<Mutex<Option<SyncSession>>>,
}

impl SnmpSession {
    /// Creates an unconnected session.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Option<SyncSession>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DeviceSession for SnmpSession {
    async fn connect(&self, target: &SessionTarget) -> Result<(), SessionError> {
        if self.is_connected() {
            return Err(SessionError::AlreadyConnected);
        }
        let sess = SyncSession::new(
            target.addr,
            target.community.as_bytes(),
            Some(target.timeout),
            0,
        )
        .map_err(|source| SessionError::Connect {
            target: target.to_string(),
            source,
        })?;
        *self.guard() = Some(sess);
        debug!(target = %target, "snmp session open");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.guard().is_some()
    }

    async fn query(&self, oids: &[String]) -> Result<Snapshot, SessionError> {
        let names = oids
            .iter()
            .map(|oid| parse_oid(oid).map(|n| (oid.clone(), n)))
            .collect::<Result<Vec<_>, _>>()?;
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || -> Result<Snapshot, SessionError> {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            let sess = guard.as_mut().ok_or(SessionError::NotConnected)?;

            let mut values = BTreeMap::new();
            for (oid, name) in &names {
                let mut pdu = sess
                    .get(name)
                    .map_err(|e| SessionError::Query(format!("{oid}: {e:?}")))?;
                if pdu.error_status != 0 {
                    return Err(SessionError::Query(format!(
                        "{oid}: error status {}",
                        pdu.error_status
                    )));
                }
                let rendered = pdu
                    .varbinds
                    .next()
                    .map(|(_, value)| render(&value))
                    .unwrap_or_else(|| ABSENT.to_string());
                values.insert(oid.clone(), rendered);
            }
            Ok(Snapshot::new(Utc::now(), values))
        })
        .await
        .map_err(|e| SessionError::Query(format!("query task: {e}")))?
    }

    async fn close(&self) {
        if self.guard().take().is_some() {
            debug!("snmp session closed");
        }
    }
}

/// Parses a dotted numeric OID, tolerating one leading dot.
pub fn parse_oid(oid: &str) -> Result<Vec<u32>, SessionError> {
    let trimmed = oid.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return Err(SessionError::BadIdentifier(oid.to_string()));
    }
    trimmed
        .split('.')
        .map(|arc| arc.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| SessionError::BadIdentifier(oid.to_string()))
}

/// Octet strings as text, everything numeric in decimal.
fn render(value: &Value<'_>) -> String {
    match value {
        Value::OctetString(bytes) | Value::Opaque(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        Value::Integer(n) => n.to_string(),
        Value::Counter32(n) | Value::Unsigned32(n) | Value::Timeticks(n) => n.to_string(),
        Value::Counter64(n) => n.to_string(),
        Value::Boolean(b) => u8::from(*b).to_string(),
        Value::IpAddress(octets) => Ipv4Addr::from(*octets).to_string(),
        Value::Null => {
            ABSENT.to_string()
        }
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_oid_accepts_dotted_numbers() {
        assert_eq!(parse_oid("1.3.6.1.2.1.1.1.0").unwrap(), vec![1, 3, 6, 1, 2, 1, 1, 1, 0]);
        assert_eq!(parse_oid(".1.3.6").unwrap(), vec![1, 3, 6]);
    }

    #[test]
    fn parse_oid_rejects_garbage() {
        assert!(matches!(parse_oid(""), Err(SessionError::BadIdentifier(_))));
        assert!(matches!(parse_oid("1.3.x"), Err(SessionError::BadIdentifier(_))));
        assert!(matches!(parse_oid("1..3"), Err(SessionError::BadIdentifier(_))));
    }

    #[test]
    fn render_values() {
        assert_eq!(render(&Value::OctetString(b"EMC-1A")), "EMC-1A");
        assert_eq!(render(&Value::Integer(-4)), "-4");
        assert_eq!(render(&Value::Counter32(7)), "7");
        assert_eq!(render(&Value::NoSuchObject), "0");
        assert_eq!(render(&Value::IpAddress([10, 0, 0, 1])), "10.0.0.1");
    }

    #[tokio::test]
    async fn query_without_connect_fails() {
        let sess = SnmpSession::new();
        assert!(!sess.is_connected());
        let err = sess.query(&["1.3.6.1".to_string()]).await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
        sess.close().await;
    }
}
