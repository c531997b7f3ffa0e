//! Per-channel (OID) metadata and human-readable value rendering.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a raw device value is turned into display text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Passed through unchanged.
    #[default]
    String,
    /// Decimal number multiplied by `scaling`.
    Number,
    /// Unsigned bit field of `scaling` bits, printed MSB-first after reversal.
    Bitreverse,
    /// Index into `values`.
    Map,
    /// Bit set whose bit `i` names `values[i]`.
    Bitmap,
    /// Anything else found in the config file.
    #[serde(other)]
    Unknown,
}

/// Detailed info for one polled identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelInfo {
    /// Dotted numeric SNMP object identifier.
    pub oid: String,
    /// Short code used in emitted records.
    #[serde(default)]
    pub chancode: String,
    /// Human label, used in logs and `status`.
    #[serde(default)]
    pub label: String,
    /// Display units.
    #[serde(default)]
    pub units: String,
    /// Rendering rule.
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    /// Multiplier for numbers, bit width for bit-reversed fields.
    #[serde(default = "default_scaling")]
    pub scaling: f64,
    /// Lookup table for `map` and `bitmap` channels.
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_scaling() -> f64 {
    1.0
}

impl ChannelInfo {
    /// Renders a raw device value for output.
    ///
    /// Values that cannot be interpreted under the channel's rule are
    /// returned unchanged.
    pub fn value_string(&self, raw: &str) -> String {
        let rendered = match self.kind {
            ChannelKind::String => Some(raw.to_string()),
            ChannelKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| format!("{:4.1}", v * self.scaling)),
            ChannelKind::Bitreverse => raw.trim().parse::<u64>().ok().map(|v| {
                let width = self.scaling.max(0.0) as u32;
                format!(
                    "{:0width$b}",
                    reverse_bits(v, width),
                    width = width as usize
                )
            }),
            ChannelKind::Map => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| self.values.get(i).cloned()),
            ChannelKind::Bitmap => raw.trim().parse::<u64>().ok().map(|v| {
                let s = bitmap_string(v, &self.values);
                if s.is_empty() {
                    "None".to_string()
                } else {
                    s
                }
            }),
            ChannelKind::Unknown => None,
        };

        rendered.unwrap_or_else(|| {
            debug!(oid = %self.oid, kind = ?self.kind, raw, "value left unformatted");
            raw.to_string()
        })
    }
}

/// Reverses the low `width` bits of `num`. Higher bits are discarded.
pub fn reverse_bits(num: u64, width: u32) -> u64 {
    if width == 0 {
        return 0;
    }
    let width = width.min(64);
    let masked = if width == 64 { num } else { num & ((1u64 << width) - 1) };
    masked.reverse_bits() >> (64 - width)
}

/// Names of every set bit, joined by `", "`.
pub fn bitmap_string(bits: u64, names: &[String]) -> String {
    names
        .iter()
        .take(64)
        .enumerate()
        .filter(|(i, _)| bits & (1u64 << i) != 0)
        .map(|(_, name)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
