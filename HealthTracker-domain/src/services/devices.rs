use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use health_tracker_data::models::Device;
use health_tracker_data::repository::{DeviceRepositoryTrait, RepositoryError, UserRepositoryTrait};

use super::{validate_request, ServiceError};
use crate::entities::conversions;
use crate::entities::{RegisterDeviceRequest, SyncDeviceRequest};

/// Trait for device operations
#[async_trait]
pub trait DeviceServiceTrait: Send + Sync {
    /// Register a device for an existing user
    async fn register_device(&self, request: RegisterDeviceRequest) -> Result<Device, ServiceError>;

    /// Record a sync: sets `last_sync_at` to now and applies an optional rename
    async fn sync_device(&self, id: i64, request: SyncDeviceRequest) -> Result<Device, ServiceError>;

    /// Get a device by ID
    async fn get_device(&self, id: i64) -> Result<Device, ServiceError>;

    /// Devices owned by a user; NotFound when the user does not exist
    async fn list_user_devices(&self, user_id: i64) -> Result<Vec<Device>, ServiceError>;

    /// Delete a device
    async fn delete_device(&self, id: i64) -> Result<(), ServiceError>;
}

/// Device service backed by the device and user repositories
pub struct DeviceService {
    devices: Arc<dyn DeviceRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
}

impl DeviceService {
    pub fn new(devices: Arc<dyn DeviceRepositoryTrait>, users: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { devices, users }
    }
}

#[async_trait]
impl DeviceServiceTrait for DeviceService {
    async fn register_device(&self, request: RegisterDeviceRequest) -> Result<Device, ServiceError> {
        validate_request(&request)?;
        let user_id = request.user_id;
        let device = conversions::convert_to_data_device(request, Utc::now());

        let device = self.devices.save(device).await.map_err(|err| match err {
            RepositoryError::ConstraintViolation(_) => {
                ServiceError::ConstraintViolation(format!("user {} does not exist", user_id))
            }
            other => other.into(),
        })?;

        info!(
            "Registered {} device {:?} for user {}",
            device.device_type, device.id, device.user_id
        );
        Ok(device)
    }

    async fn sync_device(&self, id: i64, request: SyncDeviceRequest) -> Result<Device, ServiceError> {
        validate_request(&request)?;
        let mut device = self.devices.find_by_id(id).await?;
        if let Some(name) = request.device_name {
            device.device_name = name;
        }
        device.last_sync_at = Some(Utc::now());

        let device = self.devices.save(device).await?;
        info!("Synced device {}", id);
        Ok(device)
    }

    async fn get_device(&self, id: i64) -> Result<Device, ServiceError> {
        debug!("Getting device {}", id);
        Ok(self.devices.find_by_id(id).await?)
    }

    async fn list_user_devices(&self, user_id: i64) -> Result<Vec<Device>, ServiceError> {
        self.users.find_by_id(user_id).await?;
        Ok(self.devices.find_by_user(user_id).await?)
    }

    async fn delete_device(&self, id: i64) -> Result<(), ServiceError> {
        self.devices.delete_by_id(id).await?;
        info!("Deleted device {}", id);
        Ok(())
    }
}
