use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::{DeviceType, ParseEnumError};
use crate::repository::Entity;

/// Kind of measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Steps,
    Heartbeat,
    BloodPressure,
    AirQuality,
    RoomTemperature,
    /// Carbon dioxide concentration. Older clients send `C02`.
    #[serde(rename = "CO2", alias = "C02")]
    Co2,
}

impl DataType {
    /// Stored label of the data type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Steps => "STEPS",
            DataType::Heartbeat => "HEARTBEAT",
            DataType::BloodPressure => "BLOOD_PRESSURE",
            DataType::AirQuality => "AIR_QUALITY",
            DataType::RoomTemperature => "ROOM_TEMPERATURE",
            DataType::Co2 => "CO2",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STEPS" => Ok(DataType::Steps),
            "HEARTBEAT" => Ok(DataType::Heartbeat),
            "BLOOD_PRESSURE" => Ok(DataType::BloodPressure),
            "AIR_QUALITY" => Ok(DataType::AirQuality),
            "ROOM_TEMPERATURE" => Ok(DataType::RoomTemperature),
            "CO2" | "C02" => Ok(DataType::Co2),
            _ => Err(ParseEnumError::new("data type", s)),
        }
    }
}

/// Storage model for a single measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    /// Identifier assigned by storage; `None` until first saved
    pub id: Option<i64>,

    /// Device that produced the measurement, if it is registered
    pub device_id: Option<i64>,

    /// Kind of device that produced the measurement
    pub device_type: DeviceType,

    /// When the measurement was taken
    pub measured_at: DateTime<Utc>,

    /// Kind of measurement
    pub data_type: DataType,

    /// Numeric value of the measurement
    pub value_numeric: f64,

    /// Optional textual value (e.g. "120/80")
    pub value_text: Option<String>,

    /// Optional unit of the numeric value
    pub unit: Option<String>,

    /// Whether the measurement is publicly visible
    pub is_public: bool,
}

impl Entity for HealthData {
    const KIND: &'static str = "HealthData";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
