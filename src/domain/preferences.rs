// User interface preferences
use super::status::NodeStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Vi,
    En,
}

/// Labels shown next to values on cards and the detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Temperature,
    Humidity,
    Co2,
    Battery,
    AirTemperature,
    AirHumidity,
    RadiantTemperature,
    Co2Concentration,
    NoEmail,
}

impl Locale {
    /// Accepts tags such as `en-US`, matching on the primary subtag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "vi" => Some(Locale::Vi),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn status_label(self, status: NodeStatus) -> &'static str {
        match (self, status) {
            (Locale::En, NodeStatus::Safe) => "Safe",
            (Locale::En, NodeStatus::Warning) => "Warning",
            (Locale::En, NodeStatus::Offline) => "Offline",
            (Locale::En, NodeStatus::NoData) => "No data",
            (Locale::Vi, NodeStatus::Safe) => "An toàn",
            (Locale::Vi, NodeStatus::Warning) => "Cảnh báo",
            (Locale::Vi, NodeStatus::Offline) => "Mất kết nối",
            (Locale::Vi, NodeStatus::NoData) => "Chưa có dữ liệu",
        }
    }

    pub fn label(self, label: Label) -> &'static str {
        match (self, label) {
            (Locale::En, Label::Temperature) => "Current temperature",
            (Locale::En, Label::Humidity) => "Current humidity",
            (Locale::En, Label::Co2) => "Current CO₂",
            (Locale::En, Label::Battery) => "Battery",
            (Locale::En, Label::AirTemperature) => "Air temperature",
            (Locale::En, Label::AirHumidity) => "Air humidity",
            (Locale::En, Label::RadiantTemperature) => "Radiant temperature",
            (Locale::En, Label::Co2Concentration) => "CO₂ concentration",
            (Locale::En, Label::NoEmail) => "No email",
            (Locale::Vi, Label::Temperature) => "Nhiệt độ hiện tại",
            (Locale::Vi, Label::Humidity) => "Độ ẩm hiện tại",
            (Locale::Vi, Label::Co2) => "CO₂ hiện tại",
            (Locale::Vi, Label::Battery) => "Pin",
            (Locale::Vi, Label::AirTemperature) => "Nhiệt độ không khí",
            (Locale::Vi, Label::AirHumidity) => "Độ ẩm không khí",
            (Locale::Vi, Label::RadiantTemperature) => "Nhiệt độ bức xạ",
            (Locale::Vi, Label::Co2Concentration) => "Nồng độ CO₂",
            (Locale::Vi, Label::NoEmail) => "Không có email",
        }
    }
}
