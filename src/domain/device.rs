// Device domain model
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Address of a physical sensor node. Always a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct DevAddr(NonZeroU32);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DevAddrError {
    #[error("device address must be a positive integer, got {0:?}")]
    NotAnInteger(String),
    #[error("device address must be positive, got {0}")]
    NotPositive(i64),
    #[error("device address {0} is out of range")]
    OutOfRange(i64),
}

impl DevAddr {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// Parse user input such as an add-node form field.
    pub fn parse(input: &str) -> Result<Self, DevAddrError> {
        let trimmed = input.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| DevAddrError::NotAnInteger(trimmed.to_string()))?;
        Self::try_from(value)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<i64> for DevAddr {
    type Error = DevAddrError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(DevAddrError::NotPositive(value));
        }
        let value = u32::try_from(value).map_err(|_| DevAddrError::OutOfRange(value))?;
        // value > 0 was checked above
        Self::new(value).ok_or(DevAddrError::NotPositive(0))
    }
}

impl From<DevAddr> for u32 {
    fn from(addr: DevAddr) -> Self {
        addr.get()
    }
}

impl fmt::Display for DevAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map pin assigned by the user to a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

impl NodeLocation {
    pub fn new(lat: f64, lng: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(LocationError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn validate(self) -> Result<Self, LocationError> {
        Self::new(self.lat, self.lng)
    }
}
