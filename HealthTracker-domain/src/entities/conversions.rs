use chrono::{DateTime, Utc};

use health_tracker_data::models::{Device, HealthData, User};

use super::{CreateUserRequest, HealthDataRequest, RegisterDeviceRequest, UpdateUserRequest};
use crate::services::ServiceError;

/// Conversion functions from validated requests to data models.
/// They follow the pattern convert_to_data_[model_name].

/// Convert a create request into an unsaved user
pub fn convert_to_data_user(request: CreateUserRequest) -> User {
    User::new(request.username, request.role.unwrap_or_default())
}

/// Apply the present fields of an update request to a stored user
pub fn apply_user_update(mut user: User, request: UpdateUserRequest) -> User {
    if let Some(username) = request.username {
        user.username = username;
    }
    if let Some(role) = request.role {
        user.role = role;
    }
    user
}

/// Convert a registration request into an unsaved device
pub fn convert_to_data_device(request: RegisterDeviceRequest, registered_at: DateTime<Utc>) -> Device {
    Device {
        id: None,
        user_id: request.user_id,
        device_type: request.device_type,
        device_name: request.device_name,
        registered_at,
        last_sync_at: None,
    }
}

/// Convert a measurement request into an unsaved health data record.
///
/// `device` is the registered device named by `device_id`, already looked up.
/// Its type wins; a request naming a different type is rejected. Without a
/// device the request must carry `device_type`.
pub fn convert_to_data_health_data(
    request: HealthDataRequest,
    device: Option<&Device>,
) -> Result<HealthData, ServiceError> {
    let device_type = match (device, request.device_type) {
        (Some(device), Some(requested)) if requested != device.device_type => {
            return Err(ServiceError::ConstraintViolation(format!(
                "device {} is a {}, not a {}",
                device.id.unwrap_or_default(),
                device.device_type,
                requested
            )));
        }
        (Some(device), _) => device.device_type,
        (None, Some(requested)) => requested,
        (None, None) => {
            return Err(ServiceError::ConstraintViolation(
                "device_type is required when device_id is absent".to_string(),
            ));
        }
    };

    let measured_at = request
        .measured_at
        .ok_or_else(|| ServiceError::ConstraintViolation("measured_at is required".to_string()))?;
    let data_type = request
        .data_type
        .ok_or_else(|| ServiceError::ConstraintViolation("data_type is required".to_string()))?;
    let value_numeric = request
        .value_numeric
        .ok_or_else(|| ServiceError::ConstraintViolation("value_numeric is required".to_string()))?;

    Ok(HealthData {
        id: None,
        device_id: device.and_then(|device| device.id),
        device_type,
        measured_at,
        data_type,
        value_numeric,
        value_text: request.value_text,
        unit: request.unit,
        is_public: request.is_public.unwrap_or(false),
    })
}
