// Sensor reading domain model
use serde::{Deserialize, Serialize};

/// One record pushed by the graph backend for a device.
/// Every field is optional: absence means "not reported yet", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "DevAddr", default, skip_serializing_if = "Option::is_none")]
    pub dev_addr: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(rename = "maxT", default, skip_serializing_if = "Option::is_none")]
    pub max_t: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl SensorReading {
    /// Timestamp in epoch milliseconds.
    /// Accepts RFC 3339 strings and plain epoch-millisecond integers.
    pub fn timestamp_ms(&self) -> Option<i64> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(time) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(time.timestamp_millis());
        }
        raw.parse::<i64>().ok()
    }

    pub fn is_on_fire(&self) -> bool {
        self.fire.unwrap_or(false)
    }
}
