// Node status derivation
use super::reading::SensorReading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node whose newest reading is older than this is offline.
pub const STALE_AFTER_MS: i64 = 60_000;
pub const WARNING_TEMPERATURE: f64 = 40.0;
pub const WARNING_CO2: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    NoData,
    Offline,
    Warning,
    Safe,
}

impl NodeStatus {
    /// Safe and warning nodes are reporting; offline and no-data nodes are not.
    pub fn is_active(self) -> bool {
        matches!(self, NodeStatus::Safe | NodeStatus::Warning)
    }

    /// Map marker (stroke, fill) colors.
    pub fn marker_colors(self) -> (&'static str, &'static str) {
        match self {
            NodeStatus::Safe => ("#22c55e", "#16a34a"),
            NodeStatus::Warning => ("#ef4444", "#dc2626"),
            NodeStatus::Offline => ("#f59e0b", "#d97706"),
            NodeStatus::NoData => ("#6b7280", "#4b5563"),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeStatus::NoData => "no_data",
            NodeStatus::Offline => "offline",
            NodeStatus::Warning => "warning",
            NodeStatus::Safe => "safe",
        };
        f.write_str(name)
    }
}

/// Derive a node's status from its newest reading at wall-clock time `now_ms`.
///
/// Precedence is no-data, then offline, then warning, then safe: a stale
/// reading reports offline even if its values would have raised a warning.
/// A timestamp that is present but unparseable counts as seen, so the
/// staleness check is skipped and the thresholds decide.
pub fn derive_status(reading: Option<&SensorReading>, now_ms: i64) -> NodeStatus {
    let Some(reading) = reading.filter(|r| r.timestamp.is_some()) else {
        return NodeStatus::NoData;
    };

    if let Some(ts) = reading.timestamp_ms() {
        if now_ms.saturating_sub(ts) > STALE_AFTER_MS {
            return NodeStatus::Offline;
        }
    }

    if is_warning(reading) {
        NodeStatus::Warning
    } else {
        NodeStatus::Safe
    }
}

pub fn is_warning(reading: &SensorReading) -> bool {
    reading.is_on_fire()
        || reading.temperature.is_some_and(|t| t >= WARNING_TEMPERATURE)
        || reading.co2.is_some_and(|c| c >= WARNING_CO2)
}
