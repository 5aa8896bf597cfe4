// Dashboard service - Builds the dashboard, detail and map views from state
use crate::application::dashboard_state::{DashboardState, StateHandle};
use crate::domain::dashboard::{
    DashboardView, MapMarker, MapMode, MapView, NodeCard, NodeDetailView, Summary, UserHeader,
    map_center,
};
use crate::domain::device::DevAddr;
use crate::domain::preferences::{Label, Locale};
use crate::domain::reading::SensorReading;
use crate::domain::session::UserInfo;
use crate::domain::status::NodeStatus;
use crate::domain::telemetry::{ChartData, TileData, TimeSeriesPoint, format_value};

#[derive(Clone)]
pub struct DashboardService {
    state: StateHandle,
}

impl DashboardService {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }

    pub async fn get_dashboard(&self, user: &UserInfo, now_ms: i64) -> DashboardView {
        let state = self.state.read().await;
        build_dashboard(&state, user, now_ms)
    }

    /// `None` when the device is not tracked.
    pub async fn get_node_detail(
        &self,
        dev_addr: DevAddr,
        user: &UserInfo,
        now_ms: i64,
    ) -> Option<NodeDetailView> {
        let state = self.state.read().await;
        build_node_detail(&state, dev_addr, user, now_ms)
    }

    /// `None` when focused on a device that is not tracked.
    pub async fn get_map(&self, mode: MapMode, now_ms: i64) -> Option<MapView> {
        let state = self.state.read().await;
        build_map(&state, mode, now_ms)
    }
}

fn user_header(user: &UserInfo, locale: Locale) -> UserHeader {
    UserHeader {
        username: user.username.clone(),
        email: user.display_email(locale),
        avatar: user.avatar_initial(),
    }
}

fn build_dashboard(state: &DashboardState, user: &UserInfo, now_ms: i64) -> DashboardView {
    let locale = state.locale;
    let mut summary = Summary {
        total: state.devices.len(),
        ..Default::default()
    };
    let mut newest: Option<(i64, &str)> = None;
    let mut cards = Vec::with_capacity(state.devices.len());

    for &dev_addr in &state.devices {
        let reading = state.latest.get(&dev_addr);
        let status = state.status_of(dev_addr, now_ms);

        if status.is_active() {
            summary.active += 1;
        } else {
            summary.inactive += 1;
        }
        if status == NodeStatus::Warning {
            summary.warning += 1;
        }
        if let Some(r) = reading {
            if let (Some(ts), Some(raw)) = (r.timestamp_ms(), r.timestamp.as_deref()) {
                if newest.is_none_or(|(best, _)| ts > best) {
                    newest = Some((ts, raw));
                }
            }
        }

        cards.push(NodeCard {
            dev_addr,
            status,
            status_label: locale.status_label(status).to_string(),
            temperature: format_value(reading.and_then(|r| r.temperature), "°C"),
            humidity: format_value(reading.and_then(|r| r.humidity), "%"),
            co2: format_value(reading.and_then(|r| r.co2), " ppm"),
            battery: format_value(reading.and_then(|r| r.battery), "%"),
            timestamp: reading.and_then(|r| r.timestamp.clone()),
            location: state.locations.get(&dev_addr).copied(),
        });
    }
    summary.last_update = newest.map(|(_, raw)| raw.to_string());

    DashboardView {
        user: user_header(user, locale),
        theme: state.theme,
        locale,
        summary,
        cards,
    }
}

fn build_node_detail(
    state: &DashboardState,
    dev_addr: DevAddr,
    user: &UserInfo,
    now_ms: i64,
) -> Option<NodeDetailView> {
    if !state.is_tracked(dev_addr) {
        return None;
    }
    let locale = state.locale;
    let history = state.history.get(&dev_addr);
    let latest = history.and_then(|h| h.latest());
    let status = state.status_of(dev_addr, now_ms);

    let tiles = vec![
        TileData::new(
            "temperature",
            locale.label(Label::Temperature),
            "°C",
            latest.and_then(|r| r.temperature),
        ),
        TileData::new(
            "humidity",
            locale.label(Label::Humidity),
            "%",
            latest.and_then(|r| r.humidity),
        ),
        TileData::new("co2", locale.label(Label::Co2), " ppm", latest.and_then(|r| r.co2)),
        TileData::new(
            "battery",
            locale.label(Label::Battery),
            "%",
            latest.and_then(|r| r.battery),
        ),
    ];

    // Charts plot oldest to newest
    let oldest_first: Vec<&SensorReading> = history
        .map(|h| h.iter().rev().collect())
        .unwrap_or_default();
    let charts = vec![
        ChartData::new(
            "temperature",
            locale.label(Label::AirTemperature),
            "°C",
            chart_points(&oldest_first, |r| r.temperature),
        ),
        ChartData::new(
            "humidity",
            locale.label(Label::AirHumidity),
            "%",
            chart_points(&oldest_first, |r| r.humidity),
        ),
        ChartData::new(
            "radiant_temperature",
            locale.label(Label::RadiantTemperature),
            "°C",
            chart_points(&oldest_first, |r| r.max_t),
        ),
        ChartData::new(
            "co2",
            locale.label(Label::Co2Concentration),
            "ppm",
            chart_points(&oldest_first, |r| r.co2),
        ),
    ];

    let table = history
        .map(|h| h.iter().cloned().collect())
        .unwrap_or_default();

    Some(NodeDetailView {
        user: user_header(user, locale),
        dev_addr,
        status,
        status_label: locale.status_label(status).to_string(),
        tiles,
        charts,
        table,
    })
}

fn chart_points(
    oldest_first: &[&SensorReading],
    field: fn(&SensorReading) -> Option<f64>,
) -> Vec<TimeSeriesPoint> {
    oldest_first
        .iter()
        .filter_map(|r| Some(TimeSeriesPoint::new(r.timestamp_ms()?, field(r)?)))
        .collect()
}

fn build_map(state: &DashboardState, mode: MapMode, now_ms: i64) -> Option<MapView> {
    let focus: Vec<DevAddr> = match mode {
        MapMode::Single { dev_addr } if state.is_tracked(dev_addr) => vec![dev_addr],
        MapMode::Single { .. } => return None,
        MapMode::All => state.devices.clone(),
    };

    let pins: Vec<_> = focus
        .iter()
        .filter_map(|d| state.locations.get(d).copied())
        .collect();
    let center = map_center(mode, &pins);

    let markers = focus
        .into_iter()
        .map(|dev_addr| {
            let status = state.status_of(dev_addr, now_ms);
            let (stroke, fill) = status.marker_colors();
            let pin = state.locations.get(&dev_addr).copied();
            MapMarker {
                dev_addr,
                position: pin.unwrap_or(center),
                pinned: pin.is_some(),
                status,
                stroke,
                fill,
                reading: state.latest.get(&dev_addr).cloned(),
            }
        })
        .collect();

    Some(MapView {
        mode,
        center,
        editable: matches!(mode, MapMode::Single { .. }),
        markers,
    })
}
