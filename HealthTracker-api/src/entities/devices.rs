use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use health_tracker_domain::models::{Device, DeviceType};

/// A registered device
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    pub device_type: DeviceType,

    pub device_name: String,

    pub registered_at: DateTime<Utc>,

    /// Absent until the device syncs for the first time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id.unwrap_or_default(),
            user_id: device.user_id,
            device_type: device.device_type,
            device_name: device.device_name,
            registered_at: device.registered_at,
            last_sync_at: device.last_sync_at,
        }
    }
}
