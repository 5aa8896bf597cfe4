// Bounded per-device reading history
use super::device::DevAddr;
use super::reading::SensorReading;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

pub const HISTORY_CAPACITY: usize = 20;

/// Newest-first ring of recent readings. Never longer than `HISTORY_CAPACITY`;
/// the oldest entry is evicted from the tail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SensorReading>", into = "Vec<SensorReading>")]
pub struct HistoryRing {
    readings: VecDeque<SensorReading>,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, reading: SensorReading) {
        self.readings.push_front(reading);
        self.readings.truncate(HISTORY_CAPACITY);
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.front()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SensorReading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl From<Vec<SensorReading>> for HistoryRing {
    /// Takes a newest-first list, keeping at most the first `HISTORY_CAPACITY` entries.
    fn from(mut readings: Vec<SensorReading>) -> Self {
        readings.truncate(HISTORY_CAPACITY);
        Self {
            readings: readings.into(),
        }
    }
}

impl From<HistoryRing> for Vec<SensorReading> {
    fn from(ring: HistoryRing) -> Self {
        ring.readings.into()
    }
}

pub type HistoryMap = BTreeMap<DevAddr, HistoryRing>;
