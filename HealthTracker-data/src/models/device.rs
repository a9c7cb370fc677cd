use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::ParseEnumError;
use crate::repository::Entity;

/// Kind of device that produces measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    /// Wrist-worn wearable (steps, heartbeat)
    Smartwatch,

    /// Stationary home hub (air quality, room temperature, CO2)
    HealthHub,

    /// Phone-based health platform (e.g. a fitness app)
    Phone,
}

impl DeviceType {
    /// All known device types
    pub const ALL: [DeviceType; 3] = [DeviceType::Smartwatch, DeviceType::HealthHub, DeviceType::Phone];

    /// Stored label of the device type
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Smartwatch => "SMARTWATCH",
            DeviceType::HealthHub => "HEALTH_HUB",
            DeviceType::Phone => "PHONE",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMARTWATCH" => Ok(DeviceType::Smartwatch),
            "HEALTH_HUB" => Ok(DeviceType::HealthHub),
            "PHONE" => Ok(DeviceType::Phone),
            _ => Err(ParseEnumError::new("device type", s)),
        }
    }
}

/// Storage model for a registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Identifier assigned by storage; `None` until first saved
    pub id: Option<i64>,

    /// Owning user
    pub user_id: i64,

    /// Kind of device
    pub device_type: DeviceType,

    /// Display name chosen by the user
    pub device_name: String,

    /// When the device was registered
    pub registered_at: DateTime<Utc>,

    /// When the device last synchronized its measurements
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Entity for Device {
    const KIND: &'static str = "Device";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
