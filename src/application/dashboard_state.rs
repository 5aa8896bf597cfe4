// Shared in-memory dashboard state
use crate::application::persistence::{LocationMap, PersistedState};
use crate::domain::device::{DevAddr, NodeLocation};
use crate::domain::history::{HistoryMap, HistoryRing};
use crate::domain::preferences::{Locale, Theme};
use crate::domain::reading::SensorReading;
use crate::domain::status::{NodeStatus, derive_status};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A status change observed by the periodic refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub dev_addr: DevAddr,
    pub from: NodeStatus,
    pub to: NodeStatus,
}

#[derive(Debug, Default)]
pub struct DashboardState {
    /// Tracked devices in the order they were added.
    pub devices: Vec<DevAddr>,
    pub latest: BTreeMap<DevAddr, SensorReading>,
    pub history: HistoryMap,
    pub locations: LocationMap,
    pub theme: Theme,
    pub locale: Locale,
    /// Snapshot from the last refresh; views derive status fresh.
    pub statuses: BTreeMap<DevAddr, NodeStatus>,
}

impl DashboardState {
    /// Restore from persisted slots. The current reading of each device is the
    /// head of its history; history for untracked devices is dropped.
    pub fn restore(persisted: PersistedState) -> Self {
        let PersistedState {
            devices,
            mut history,
            locations,
            theme,
            locale,
        } = persisted;

        history.retain(|addr, _| devices.contains(addr));
        let mut state = Self {
            devices,
            latest: BTreeMap::new(),
            history,
            locations,
            theme,
            locale,
            statuses: BTreeMap::new(),
        };
        state.reset_latest();
        state
    }

    /// Rebuild every current reading from the head of its history ring.
    pub fn reset_latest(&mut self) {
        self.latest = self
            .history
            .iter()
            .filter_map(|(addr, ring)| ring.latest().map(|r| (*addr, r.clone())))
            .collect();
    }

    pub fn is_tracked(&self, dev_addr: DevAddr) -> bool {
        self.devices.contains(&dev_addr)
    }

    /// Record a pushed reading. Returns false, leaving state untouched, when
    /// the device is no longer tracked.
    pub fn apply_reading(&mut self, dev_addr: DevAddr, reading: SensorReading) -> bool {
        if !self.is_tracked(dev_addr) {
            return false;
        }
        self.history
            .entry(dev_addr)
            .or_insert_with(HistoryRing::new)
            .push(reading.clone());
        self.latest.insert(dev_addr, reading);
        true
    }

    /// Returns false when the address is already tracked.
    pub fn add_device(&mut self, dev_addr: DevAddr) -> bool {
        if self.is_tracked(dev_addr) {
            return false;
        }
        self.devices.push(dev_addr);
        true
    }

    /// Stop tracking a device and purge its reading, history and map pin.
    pub fn remove_device(&mut self, dev_addr: DevAddr) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| *d != dev_addr);
        if self.devices.len() == before {
            return false;
        }
        self.latest.remove(&dev_addr);
        self.history.remove(&dev_addr);
        self.locations.remove(&dev_addr);
        self.statuses.remove(&dev_addr);
        true
    }

    /// Returns false when the device is not tracked.
    pub fn set_location(&mut self, dev_addr: DevAddr, location: NodeLocation) -> bool {
        if !self.is_tracked(dev_addr) {
            return false;
        }
        self.locations.insert(dev_addr, location);
        true
    }

    pub fn status_of(&self, dev_addr: DevAddr, now_ms: i64) -> NodeStatus {
        derive_status(self.latest.get(&dev_addr), now_ms)
    }

    /// Recompute every tracked device's status and report what changed.
    pub fn refresh_statuses(&mut self, now_ms: i64) -> Vec<StatusTransition> {
        let mut transitions = Vec::new();
        let mut statuses = BTreeMap::new();
        for &dev_addr in &self.devices {
            let to = self.status_of(dev_addr, now_ms);
            if let Some(&from) = self.statuses.get(&dev_addr) {
                if from != to {
                    transitions.push(StatusTransition { dev_addr, from, to });
                }
            }
            statuses.insert(dev_addr, to);
        }
        self.statuses = statuses;
        transitions
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<DashboardState>>;

pub fn new_state_handle(state: DashboardState) -> StateHandle {
    Arc::new(RwLock::new(state))
}
