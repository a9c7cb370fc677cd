// Domain entities: validated request payloads accepted by the services
pub mod conversions;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::{IntoParams, ToSchema};

use health_tracker_data::models::{DataType, DeviceType, UserRole};

/// Request payload for creating a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CreateUserRequest {
    /// Unique login name
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,

    /// Role of the user. Defaults to `USER`.
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Request payload for updating a user; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,

    pub role: Option<UserRole>,
}

/// Request payload for registering a device
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RegisterDeviceRequest {
    /// Owning user
    pub user_id: i64,

    pub device_type: DeviceType,

    /// Display name of the device
    #[validate(length(min = 1, max = 100, message = "Device name must be between 1 and 100 characters"))]
    pub device_name: String,
}

/// Request payload for a device sync
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct SyncDeviceRequest {
    /// New display name, if the device was renamed
    #[validate(length(min = 1, max = 100, message = "Device name must be between 1 and 100 characters"))]
    pub device_name: Option<String>,
}

/// Request payload for one measurement.
///
/// Required values are optional in the type so that a missing field is
/// reported by validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthDataRequest {
    /// Registered device that produced the measurement
    pub device_id: Option<i64>,

    /// Kind of device; required when `device_id` is absent
    pub device_type: Option<DeviceType>,

    /// When the measurement was taken
    #[validate(required(message = "measured_at is required"))]
    pub measured_at: Option<DateTime<Utc>>,

    #[validate(required(message = "data_type is required"))]
    pub data_type: Option<DataType>,

    #[validate(required(message = "value_numeric is required"))]
    pub value_numeric: Option<f64>,

    #[validate(length(max = 255, message = "value_text cannot exceed 255 characters"))]
    pub value_text: Option<String>,

    #[validate(length(max = 32, message = "unit cannot exceed 32 characters"))]
    pub unit: Option<String>,

    /// Defaults to false
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// Optional criteria when listing the measurements of a user or device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(IntoParams))]
#[cfg_attr(feature = "with-api", into_params(parameter_in = Query))]
pub struct HealthDataQuery {
    /// Only this kind of measurement
    pub data_type: Option<DataType>,
    /// Earliest `measured_at`, inclusive
    pub start: Option<DateTime<Utc>>,
    /// Latest `measured_at`, inclusive
    pub end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_measurement_fields_fail_validation() {
        let request: HealthDataRequest =
            serde_json::from_str(r#"{"device_type": "SMARTWATCH", "data_type": "STEPS"}"#).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("measured_at"));
        assert!(fields.contains_key("value_numeric"));
        assert!(!fields.contains_key("data_type"));
    }

    #[test]
    fn test_health_data_request_accepts_legacy_co2_label() {
        let request: HealthDataRequest = serde_json::from_str(
            r#"{"device_type": "HEALTH_HUB", "data_type": "C02", "measured_at": "2024-01-01T00:00:00Z", "value_numeric": 412.0}"#,
        )
        .unwrap();
        assert_eq!(request.data_type, Some(DataType::Co2));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_username_length_is_validated() {
        let request = CreateUserRequest {
            username: "ab".to_string(),
            role: None,
        };
        assert!(request.validate().is_err());
    }
}
