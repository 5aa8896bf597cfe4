// Dashboard view models
use super::device::{DevAddr, NodeLocation};
use super::preferences::{Locale, Theme};
use super::reading::SensorReading;
use super::status::NodeStatus;
use super::telemetry::{ChartData, TileData};
use serde::Serialize;

/// Where the map centers when no pins are known.
pub const DEFAULT_MAP_CENTER: NodeLocation = NodeLocation {
    lat: 21.0278,
    lng: 105.8342,
};

#[derive(Debug, Clone, Serialize)]
pub struct UserHeader {
    pub username: String,
    pub email: String,
    pub avatar: char,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub warning: usize,
    /// Newest reading timestamp across all tracked nodes.
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeCard {
    pub dev_addr: DevAddr,
    pub status: NodeStatus,
    pub status_label: String,
    pub temperature: String,
    pub humidity: String,
    pub co2: String,
    pub battery: String,
    pub timestamp: Option<String>,
    pub location: Option<NodeLocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub user: UserHeader,
    pub theme: Theme,
    pub locale: Locale,
    pub summary: Summary,
    pub cards: Vec<NodeCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDetailView {
    pub user: UserHeader,
    pub dev_addr: DevAddr,
    pub status: NodeStatus,
    pub status_label: String,
    pub tiles: Vec<TileData>,
    pub charts: Vec<ChartData>,
    /// Newest first.
    pub table: Vec<SensorReading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapMode {
    Single { dev_addr: DevAddr },
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub dev_addr: DevAddr,
    pub position: NodeLocation,
    /// False when the marker sits on the map center because no pin was set.
    pub pinned: bool,
    pub status: NodeStatus,
    pub stroke: &'static str,
    pub fill: &'static str,
    pub reading: Option<SensorReading>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub mode: MapMode,
    pub center: NodeLocation,
    /// Clicking the map assigns a pin only when focused on a single node.
    pub editable: bool,
    pub markers: Vec<MapMarker>,
}

/// Single mode centers on the node's pin; all mode averages the known pins.
pub fn map_center(mode: MapMode, pins: &[NodeLocation]) -> NodeLocation {
    match mode {
        MapMode::Single { .. } => pins.first().copied().unwrap_or(DEFAULT_MAP_CENTER),
        MapMode::All if pins.is_empty() => DEFAULT_MAP_CENTER,
        MapMode::All => {
            let n = pins.len() as f64;
            NodeLocation {
                lat: pins.iter().map(|p| p.lat).sum::<f64>() / n,
                lng: pins.iter().map(|p| p.lng).sum::<f64>() / n,
            }
        }
    }
}
