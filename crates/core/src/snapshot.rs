use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped set of identifier to raw value readings from the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the device answered.
    pub timestamp: DateTime<Utc>,
    /// Raw values keyed by identifier.
    pub values: BTreeMap<String, String>,
}

impl Snapshot {
    /// Builds a snapshot.
    pub fn new(timestamp: DateTime<Utc>, values: BTreeMap<String, String>) -> Self {
        Self { timestamp, values }
    }

    /// Raw value for `oid`, empty when the device did not report it.
    pub fn raw(&self, oid: &str) -> &str {
        self.values.get(oid).map(String::as_str).unwrap_or("")
    }
}
