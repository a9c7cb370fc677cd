//! Repository contracts and the storage backends that implement them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::database::{DatabaseConfig, DatabaseType, DeletePolicy};
use crate::models::{DataType, Device, DeviceType, HealthData, User};

pub mod errors;
mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use errors::RepositoryError;
pub use in_memory::InMemoryStorage;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

/// A persistable record with a storage-assigned integer id
pub trait Entity: Clone + Send + Sync + 'static {
    /// Name used in not-found errors and logs
    const KIND: &'static str;

    /// Current id, `None` when the record has never been saved
    fn id(&self) -> Option<i64>;

    /// Record the id assigned by storage
    fn set_id(&mut self, id: i64);
}

/// Generic CRUD operations shared by every entity store
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert the entity when it has no id, otherwise update the stored row.
    ///
    /// Updating an id that does not exist fails with `NotFound`.
    async fn save(&self, entity: T) -> Result<T, RepositoryError>;

    /// Save every entity in one transaction: either all are persisted or none
    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>, RepositoryError>;

    /// Look up an entity by id
    async fn find_by_id(&self, id: i64) -> Result<T, RepositoryError>;

    /// All entities in id order
    async fn find_all(&self) -> Result<Vec<T>, RepositoryError>;

    /// Delete an entity, honoring the configured [`DeletePolicy`] for dependents
    async fn delete_by_id(&self, id: i64) -> Result<(), RepositoryError>;
}

/// Store for users
pub trait UserRepositoryTrait: Repository<User> {}

/// Store for devices
#[async_trait]
pub trait DeviceRepositoryTrait: Repository<Device> {
    /// Devices owned by a user, in id order
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Device>, RepositoryError>;
}

/// Store for health measurements
#[async_trait]
pub trait HealthDataRepositoryTrait: Repository<HealthData> {
    /// Measurements matching every set field of the filter, in id order
    async fn find_filtered(&self, filter: &HealthDataFilter) -> Result<Vec<HealthData>, RepositoryError>;
}

/// Reachability probe for the storage backend
#[async_trait]
pub trait StorageStatus: Send + Sync {
    /// Short backend name, e.g. `sqlite`
    fn backend(&self) -> &'static str;

    /// Verify the backend answers and describe it
    async fn check(&self) -> Result<String, RepositoryError>;
}

/// Criteria for selecting health measurements.
///
/// Unset fields do not constrain the result. The time range is inclusive at
/// both ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthDataFilter {
    pub device_type: Option<DeviceType>,
    pub device_id: Option<i64>,
    /// Owner of the device that produced the measurement
    pub user_id: Option<i64>,
    pub data_type: Option<DataType>,
    pub is_public: Option<bool>,
    pub measured_from: Option<DateTime<Utc>>,
    pub measured_to: Option<DateTime<Utc>>,
}

impl HealthDataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = Some(device_type);
        self
    }

    pub fn device_id(mut self, device_id: i64) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn public_only(mut self) -> Self {
        self.is_public = Some(true);
        self
    }

    /// Restrict to measurements taken in `[from, to]`
    pub fn measured_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.measured_from = Some(from);
        self.measured_to = Some(to);
        self
    }

    /// Whether a record satisfies the filter.
    ///
    /// `owner` is the user owning the record's device, if any.
    pub fn matches(&self, record: &HealthData, owner: Option<i64>) -> bool {
        if self.device_type.is_some_and(|t| t != record.device_type) {
            return false;
        }
        if self.device_id.is_some() && self.device_id != record.device_id {
            return false;
        }
        if self.user_id.is_some() && self.user_id != owner {
            return false;
        }
        if self.data_type.is_some_and(|t| t != record.data_type) {
            return false;
        }
        if self.is_public.is_some_and(|p| p != record.is_public) {
            return false;
        }
        if self.measured_from.is_some_and(|from| record.measured_at < from) {
            return false;
        }
        if self.measured_to.is_some_and(|to| record.measured_at > to) {
            return false;
        }
        true
    }
}

/// Handles to every store, all backed by the same storage
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepositoryTrait>,
    pub devices: Arc<dyn DeviceRepositoryTrait>,
    pub health_data: Arc<dyn HealthDataRepositoryTrait>,
    pub status: Arc<dyn StorageStatus>,
}

impl Repositories {
    /// Open the backend selected by the configuration
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        match config.db_type {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                let pool = crate::database::create_sqlite_pool(config)?;
                Ok(Self::from_storage(SqliteStorage::new(pool, config.delete_policy)))
            }
            DatabaseType::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Ok(Self::from_storage(InMemoryStorage::with_delete_policy(config.delete_policy)))
            }
        }
    }

    /// Fresh in-memory storage with the given delete policy
    pub fn in_memory(delete_policy: DeletePolicy) -> Self {
        Self::from_storage(InMemoryStorage::with_delete_policy(delete_policy))
    }

    /// Share one storage value across every store handle
    pub fn from_storage<S>(storage: S) -> Self
    where
        S: UserRepositoryTrait + DeviceRepositoryTrait + HealthDataRepositoryTrait + StorageStatus + 'static,
    {
        let storage = Arc::new(storage);
        Self {
            users: storage.clone(),
            devices: storage.clone(),
            health_data: storage.clone(),
            status: storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(device_type: DeviceType, minutes: i64) -> HealthData {
        HealthData {
            id: Some(1),
            device_id: Some(7),
            device_type,
            measured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
            data_type: DataType::Steps,
            value_numeric: 100.0,
            value_text: None,
            unit: None,
            is_public: false,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = HealthDataFilter::new();
        assert!(filter.matches(&record(DeviceType::Phone, 0), None));
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let filter = HealthDataFilter::new().measured_between(start, start + Duration::minutes(10));

        assert!(filter.matches(&record(DeviceType::Smartwatch, 0), None));
        assert!(filter.matches(&record(DeviceType::Smartwatch, 10), None));
        assert!(!filter.matches(&record(DeviceType::Smartwatch, 11), None));
        assert!(!filter.matches(&record(DeviceType::Smartwatch, -1), None));
    }

    #[test]
    fn test_user_filter_uses_device_owner() {
        let filter = HealthDataFilter::new().user_id(3);
        assert!(filter.matches(&record(DeviceType::Smartwatch, 0), Some(3)));
        assert!(!filter.matches(&record(DeviceType::Smartwatch, 0), Some(4)));
        assert!(!filter.matches(&record(DeviceType::Smartwatch, 0), None));
    }

    #[test]
    fn test_visibility_and_type_filters() {
        let filter = HealthDataFilter::new().device_type(DeviceType::HealthHub).public_only();
        let mut hub = record(DeviceType::HealthHub, 0);
        assert!(!filter.matches(&hub, None));
        hub.is_public = true;
        assert!(filter.matches(&hub, None));
        assert!(!filter.matches(&record(DeviceType::Smartwatch, 0), None));
    }
}
