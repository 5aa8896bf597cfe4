// Persisted dashboard slots and their lenient parsers
use crate::application::key_value_store::KeyValueStore;
use crate::domain::device::{DevAddr, NodeLocation};
use crate::domain::history::{HistoryMap, HistoryRing};
use crate::domain::preferences::{Locale, Theme};
use crate::domain::reading::SensorReading;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEVICES_KEY: &str = "wildfire.devices";
pub const HISTORY_KEY: &str = "wildfire.history";
pub const THEME_KEY: &str = "wildfire.theme";
pub const LOCATIONS_KEY: &str = "wildfire.locations";
pub const LOCALE_KEY: &str = "wildfire.locale";

pub type LocationMap = BTreeMap<DevAddr, NodeLocation>;

/// Everything restored at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub devices: Vec<DevAddr>,
    pub history: HistoryMap,
    pub locations: LocationMap,
    pub theme: Theme,
    pub locale: Locale,
}

/// Reads and writes the dashboard's slots. Loading never fails: absent,
/// unreadable or malformed slots fall back to defaults. Saving is
/// write-through and failures are logged, not surfaced.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, default_devices: &[DevAddr]) -> PersistedState {
        PersistedState {
            devices: self.load_devices(default_devices).await,
            history: self.load_history().await,
            locations: self.load_locations().await,
            theme: self.load_theme().await,
            locale: self.load_locale().await,
        }
    }

    pub async fn load_devices(&self, default_devices: &[DevAddr]) -> Vec<DevAddr> {
        let Some(value) = self.read_json(DEVICES_KEY).await else {
            return default_devices.to_vec();
        };
        let devices = parse_devices(&value);
        if devices.is_empty() {
            tracing::warn!("Persisted device list has no valid addresses, using defaults");
            return default_devices.to_vec();
        }
        devices
    }

    pub async fn load_history(&self) -> HistoryMap {
        self.read_json(HISTORY_KEY)
            .await
            .map(|value| parse_history(&value))
            .unwrap_or_default()
    }

    pub async fn load_locations(&self) -> LocationMap {
        self.read_json(LOCATIONS_KEY)
            .await
            .map(|value| parse_locations(&value))
            .unwrap_or_default()
    }

    pub async fn load_theme(&self) -> Theme {
        self.read_typed(THEME_KEY).await.unwrap_or_default()
    }

    pub async fn load_locale(&self) -> Locale {
        self.read_typed(LOCALE_KEY).await.unwrap_or_default()
    }

    pub async fn save_devices(&self, devices: &[DevAddr]) {
        self.write_json(DEVICES_KEY, &devices).await;
    }

    /// An empty map clears the slot.
    pub async fn save_history(&self, history: &HistoryMap) {
        if history.is_empty() {
            self.remove_slot(HISTORY_KEY).await;
        } else {
            self.write_json(HISTORY_KEY, history).await;
        }
    }

    /// An empty map clears the slot.
    pub async fn save_locations(&self, locations: &LocationMap) {
        if locations.is_empty() {
            self.remove_slot(LOCATIONS_KEY).await;
        } else {
            self.write_json(LOCATIONS_KEY, locations).await;
        }
    }

    pub async fn save_theme(&self, theme: Theme) {
        self.write_json(THEME_KEY, &theme).await;
    }

    pub async fn save_locale(&self, locale: Locale) {
        self.write_json(LOCALE_KEY, &locale).await;
    }

    async fn read_json(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {:#}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", key, e);
                None
            }
        }
    }

    async fn read_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.read_json(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring invalid {}: {}", key, e);
                None
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to serialize {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw).await {
            tracing::error!("Failed to persist {}: {:#}", key, e);
        }
    }

    async fn remove_slot(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::error!("Failed to clear {}: {:#}", key, e);
        }
    }
}

/// Positive integer entries only, de-duplicated in their original order.
fn parse_devices(value: &Value) -> Vec<DevAddr> {
    let Some(items) = value.as_array() else {
        tracing::warn!("Persisted device list is not an array");
        return Vec::new();
    };
    let mut devices = Vec::with_capacity(items.len());
    for item in items {
        match item.as_i64().map(DevAddr::try_from) {
            Some(Ok(addr)) if !devices.contains(&addr) => devices.push(addr),
            Some(Ok(_)) => {}
            _ => tracing::warn!("Dropping invalid persisted device address {}", item),
        }
    }
    devices
}

fn parse_key(key: &str) -> Option<DevAddr> {
    // Reject forms like "+1" or "01" that are not canonical integers
    let addr = DevAddr::parse(key).ok()?;
    (addr.to_string() == key).then_some(addr)
}

fn parse_history(value: &Value) -> HistoryMap {
    let Some(entries) = value.as_object() else {
        tracing::warn!("Persisted history is not an object");
        return HistoryMap::new();
    };
    let mut history = HistoryMap::new();
    for (key, readings) in entries {
        let Some(addr) = parse_key(key) else {
            tracing::warn!("Dropping history for invalid device key {:?}", key);
            continue;
        };
        let Some(items) = readings.as_array() else {
            tracing::warn!("Dropping history for device {}: not an array", addr);
            continue;
        };
        let readings: Vec<SensorReading> = items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect();
        history.insert(addr, HistoryRing::from(readings));
    }
    history
}

fn parse_locations(value: &Value) -> LocationMap {
    let Some(entries) = value.as_object() else {
        tracing::warn!("Persisted locations are not an object");
        return LocationMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, loc)| {
            let addr = parse_key(key)?;
            let loc: NodeLocation = serde_json::from_value(loc.clone()).ok()?;
            match loc.validate() {
                Ok(loc) => Some((addr, loc)),
                Err(e) => {
                    tracing::warn!("Dropping location for device {}: {}", addr, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_store::MemoryStore;

    fn addr(n: u32) -> DevAddr {
        DevAddr::new(n).unwrap()
    }

    async fn persistence_with(entries: &[(&str, &str)]) -> Persistence {
        let store = MemoryStore::new();
        for (key, value) in entries {
            store.set(key, value).await.unwrap();
        }
        Persistence::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_empty_store_uses_defaults() {
        let persistence = persistence_with(&[]).await;
        let state = persistence.load(&[addr(1), addr(2)]).await;
        assert_eq!(state.devices, vec![addr(1), addr(2)]);
        assert!(state.history.is_empty());
        assert!(state.locations.is_empty());
        assert_eq!(state.theme, Theme::Dark);
        assert_eq!(state.locale, Locale::Vi);
    }

    #[tokio::test]
    async fn test_malformed_slots_fall_back_to_defaults() {
        let persistence = persistence_with(&[
            (DEVICES_KEY, "not json"),
            (HISTORY_KEY, "[1,2,3]"),
            (LOCATIONS_KEY, "\"north\""),
            (THEME_KEY, "\"purple\""),
            (LOCALE_KEY, "42"),
        ])
        .await;
        let state = persistence.load(&[addr(1)]).await;
        assert_eq!(state.devices, vec![addr(1)]);
        assert!(state.history.is_empty());
        assert!(state.locations.is_empty());
        assert_eq!(state.theme, Theme::default());
        assert_eq!(state.locale, Locale::default());
    }

    #[tokio::test]
    async fn test_device_list_filters_invalid_entries() {
        let persistence =
            persistence_with(&[(DEVICES_KEY, r#"[3, "4", 0, -1, 2.5, 3, 7]"#)]).await;
        assert_eq!(persistence.load_devices(&[addr(1)]).await, vec![addr(3), addr(7)]);

        let persistence = persistence_with(&[(DEVICES_KEY, r#"{"1": true}"#)]).await;
        assert_eq!(persistence.load_devices(&[addr(1)]).await, vec![addr(1)]);

        let persistence = persistence_with(&[(DEVICES_KEY, "[0, -5]")]).await;
        assert_eq!(persistence.load_devices(&[addr(9)]).await, vec![addr(9)]);
    }

    #[tokio::test]
    async fn test_history_drops_bad_keys_and_truncates() {
        let readings: Vec<String> = (0..25)
            .map(|n| format!(r#"{{"temperature":{n}}}"#))
            .collect();
        let raw = format!(
            r#"{{"1":[{}],"abc":[],"0":[],"2":"oops","3":[{{"temperature":"hot"}},{{"co2":400}}]}}"#,
            readings.join(",")
        );
        let persistence = persistence_with(&[(HISTORY_KEY, &raw)]).await;
        let history = persistence.load_history().await;

        assert_eq!(history.len(), 2);
        assert_eq!(history[&addr(1)].len(), 20);
        assert_eq!(history[&addr(1)].latest().unwrap().temperature, Some(0.0));
        assert_eq!(history[&addr(3)].len(), 1);
        assert_eq!(history[&addr(3)].latest().unwrap().co2, Some(400.0));
    }

    #[tokio::test]
    async fn test_locations_drop_out_of_range_pins() {
        let raw = r#"{"1":{"lat":21.0,"lng":105.8},"2":{"lat":120.0,"lng":0.0},"x":{"lat":1.0,"lng":1.0},"3":{"lat":"a"}}"#;
        let persistence = persistence_with(&[(LOCATIONS_KEY, raw)]).await;
        let locations = persistence.load_locations().await;
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[&addr(1)], NodeLocation { lat: 21.0, lng: 105.8 });
    }

    #[tokio::test]
    async fn test_saved_slots_load_back() {
        let persistence = persistence_with(&[]).await;

        let mut history = HistoryMap::new();
        let mut ring = HistoryRing::new();
        ring.push(SensorReading {
            timestamp: Some("2025-01-01T00:00:00Z".to_string()),
            fire: Some(true),
            ..Default::default()
        });
        history.insert(addr(5), ring);
        let mut locations = LocationMap::new();
        locations.insert(addr(5), NodeLocation { lat: 1.5, lng: 2.5 });

        persistence.save_devices(&[addr(5), addr(2)]).await;
        persistence.save_history(&history).await;
        persistence.save_locations(&locations).await;
        persistence.save_theme(Theme::Light).await;
        persistence.save_locale(Locale::En).await;

        let state = persistence.load(&[addr(1)]).await;
        assert_eq!(state.devices, vec![addr(5), addr(2)]);
        assert_eq!(state.history, history);
        assert_eq!(state.locations, locations);
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.locale, Locale::En);
    }

    #[tokio::test]
    async fn test_empty_maps_clear_their_slots() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, r#"{"1":[]}"#).await.unwrap();
        store.set(LOCATIONS_KEY, r#"{"1":{"lat":1.0,"lng":2.0}}"#).await.unwrap();
        let persistence = Persistence::new(store.clone());

        persistence.save_history(&HistoryMap::new()).await;
        persistence.save_locations(&LocationMap::new()).await;

        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), None);
        assert_eq!(store.get(LOCATIONS_KEY).await.unwrap(), None);
    }
}
