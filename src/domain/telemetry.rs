// Chart and tile view models for the node detail page
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// A single stat card, e.g. "Current temperature: 29°C".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileData {
    pub id: String,
    pub title: String,
    pub unit: String,
    pub value: Option<f64>,
    pub display: String,
}

impl TileData {
    pub fn new(id: &str, title: &str, unit: &str, value: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: unit.to_string(),
            value,
            display: format_value(value, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub id: String,
    pub title: String,
    pub unit: String,
    /// Oldest first, ready to plot.
    pub points: Vec<TimeSeriesPoint>,
    /// The consumer shows an empty-chart message instead of axes.
    pub empty: bool,
}

impl ChartData {
    pub fn new(id: &str, title: &str, unit: &str, points: Vec<TimeSeriesPoint>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: unit.to_string(),
            empty: points.is_empty(),
            points,
        }
    }
}

/// `--` for values a node has not reported yet.
pub fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, unit),
        None => "--".to_string(),
    }
}
