use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One section of the snapshot: probe name -> rendered probe report.
/// serde_json's preserve_order feature keeps entries in registry order.
pub type Section = serde_json::Map<String, Value>;

/// Tri-state outcome of a probe, as it appears in the snapshot JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    Unavailable,
    TimedOut,
}

/// Rendered result of one probe. Every registered probe produces exactly one
/// of these per run; a failed probe is an explicit entry, never a missing key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    pub detected: bool,
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// ISO-8601, local time.
    pub discovery_timestamp: String,
    pub schema_version: String,
    pub hostname: String,
    pub elapsed_ms: u64,
}

/// The complete, immutable aggregate of all probe results at one instant.
/// Superseded wholesale by the next aggregator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub hardware: Section,
    pub peripherals: Section,
    pub software: Section,
    pub network: Section,
}

impl Snapshot {
    /// Total number of probe entries across all sections.
    pub fn probe_count(&self) -> usize {
        self.hardware.len() + self.peripherals.len() + self.software.len() + self.network.len()
    }
}
