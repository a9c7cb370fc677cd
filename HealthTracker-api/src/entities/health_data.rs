use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use health_tracker_domain::models::{DataType, DeviceType, HealthData};

/// One stored measurement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthDataResponse {
    pub id: i64,

    /// Device that produced the measurement, if it was registered
    pub device_id: Option<i64>,

    pub device_type: DeviceType,

    pub measured_at: DateTime<Utc>,

    pub data_type: DataType,

    pub value_numeric: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    pub is_public: bool,
}

impl From<HealthData> for HealthDataResponse {
    fn from(data: HealthData) -> Self {
        Self {
            id: data.id.unwrap_or_default(),
            device_id: data.device_id,
            device_type: data.device_type,
            measured_at: data.measured_at,
            data_type: data.data_type,
            value_numeric: data.value_numeric,
            value_text: data.value_text,
            unit: data.unit,
            is_public: data.is_public,
        }
    }
}

/// Recent measurements keyed by device type label, e.g. `"SMARTWATCH"`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct HealthDataByDeviceType(pub IndexMap<String, Vec<HealthDataResponse>>);

impl From<IndexMap<String, Vec<HealthData>>> for HealthDataByDeviceType {
    fn from(grouped: IndexMap<String, Vec<HealthData>>) -> Self {
        Self(
            grouped
                .into_iter()
                .map(|(label, records)| (label, records.into_iter().map(HealthDataResponse::from).collect()))
                .collect(),
        )
    }
}

/// Text summary of the recent measurements
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Convert a list of stored measurements for a response body
pub fn to_responses(records: Vec<HealthData>) -> Vec<HealthDataResponse> {
    records.into_iter().map(HealthDataResponse::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> HealthData {
        HealthData {
            id: Some(id),
            device_id: None,
            device_type: DeviceType::HealthHub,
            measured_at: Utc::now(),
            data_type: DataType::Co2,
            value_numeric: 415.0,
            value_text: None,
            unit: Some("ppm".to_string()),
            is_public: true,
        }
    }

    #[test]
    fn test_grouped_response_keeps_label_order() {
        let mut grouped = IndexMap::new();
        grouped.insert("SMARTWATCH".to_string(), Vec::new());
        grouped.insert("HEALTH_HUB".to_string(), vec![record(7)]);

        let text = serde_json::to_string(&HealthDataByDeviceType::from(grouped)).unwrap();
        assert!(text.find("SMARTWATCH").unwrap() < text.find("HEALTH_HUB").unwrap());

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["HEALTH_HUB"][0]["data_type"], "CO2");
        assert_eq!(json["HEALTH_HUB"][0]["id"], 7);
        assert!(json["HEALTH_HUB"][0].get("value_text").is_none());
    }
}
