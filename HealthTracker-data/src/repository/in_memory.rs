use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::errors::RepositoryError;
use super::{
    DeviceRepositoryTrait, Entity, HealthDataFilter, HealthDataRepositoryTrait, Repository, StorageStatus,
    UserRepositoryTrait,
};
use crate::database::DeletePolicy;
use crate::models::{Device, HealthData, User};

/// Rows of one entity kind plus its id sequence
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    users: Table<User>,
    devices: Table<Device>,
    health_data: Table<HealthData>,
}

impl Tables {
    fn owner_of(&self, device_id: Option<i64>) -> Option<i64> {
        device_id.and_then(|id| self.devices.rows.get(&id)).map(|device| device.user_id)
    }
}

/// Per-entity access to the in-memory tables, with the same referential
/// rules the SQLite schema enforces.
pub trait MemoryRecord: Entity {
    fn table(tables: &Tables) -> &Table<Self>;
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    fn check_constraints(&self, _tables: &Tables) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Remove or refuse dependents of the row about to be deleted
    fn release_dependents(_tables: &mut Tables, _id: i64, _policy: DeletePolicy) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl MemoryRecord for User {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepositoryError> {
        let taken = tables
            .users
            .rows
            .values()
            .any(|other| other.username == self.username && other.id != self.id);
        if taken {
            return Err(RepositoryError::ConstraintViolation(format!(
                "username '{}' is already taken",
                self.username
            )));
        }
        Ok(())
    }

    fn release_dependents(tables: &mut Tables, id: i64, policy: DeletePolicy) -> Result<(), RepositoryError> {
        let owned: Vec<i64> = tables
            .devices
            .rows
            .values()
            .filter(|device| device.user_id == id)
            .filter_map(|device| device.id)
            .collect();
        if owned.is_empty() {
            return Ok(());
        }

        match policy {
            DeletePolicy::Restrict => Err(RepositoryError::ConstraintViolation(format!(
                "User {} still owns {} device(s)",
                id,
                owned.len()
            ))),
            DeletePolicy::Cascade => {
                tables
                    .health_data
                    .rows
                    .retain(|_, record| !record.device_id.is_some_and(|device_id| owned.contains(&device_id)));
                tables.devices.rows.retain(|device_id, _| !owned.contains(device_id));
                Ok(())
            }
        }
    }
}

impl MemoryRecord for Device {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.devices
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.devices
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepositoryError> {
        if !tables.users.rows.contains_key(&self.user_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "device references missing user {}",
                self.user_id
            )));
        }
        Ok(())
    }

    fn release_dependents(tables: &mut Tables, id: i64, policy: DeletePolicy) -> Result<(), RepositoryError> {
        let readings = tables
            .health_data
            .rows
            .values()
            .filter(|record| record.device_id == Some(id))
            .count();
        if readings == 0 {
            return Ok(());
        }

        match policy {
            DeletePolicy::Restrict => Err(RepositoryError::ConstraintViolation(format!(
                "Device {} still has {} health data record(s)",
                id, readings
            ))),
            DeletePolicy::Cascade => {
                tables.health_data.rows.retain(|_, record| record.device_id != Some(id));
                Ok(())
            }
        }
    }
}

impl MemoryRecord for HealthData {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.health_data
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.health_data
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepositoryError> {
        match self.device_id {
            Some(device_id) if !tables.devices.rows.contains_key(&device_id) => {
                Err(RepositoryError::ConstraintViolation(format!(
                    "health data references missing device {}",
                    device_id
                )))
            }
            _ => Ok(()),
        }
    }
}

fn put<T: MemoryRecord>(tables: &mut Tables, mut entity: T) -> Result<T, RepositoryError> {
    entity.check_constraints(tables)?;

    let table = T::table_mut(tables);
    match entity.id() {
        Some(id) => {
            if !table.rows.contains_key(&id) {
                return Err(RepositoryError::not_found(T::KIND, id));
            }
            table.rows.insert(id, entity.clone());
        }
        None => {
            table.last_id += 1;
            entity.set_id(table.last_id);
            table.rows.insert(table.last_id, entity.clone());
        }
    }
    Ok(entity)
}

/// Process-local storage for every entity kind.
///
/// Clones share the same tables. Data is lost when the last clone drops.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<Mutex<Tables>>,
    delete_policy: DeletePolicy,
}

impl InMemoryStorage {
    /// Create empty storage with the restrict delete policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty storage with an explicit delete policy
    pub fn with_delete_policy(delete_policy: DeletePolicy) -> Self {
        Self {
            tables: Arc::default(),
            delete_policy,
        }
    }

    fn save_one<T: MemoryRecord>(&self, entity: T) -> Result<T, RepositoryError> {
        let mut tables = self.tables.lock()?;
        put(&mut tables, entity)
    }

    fn save_many<T: MemoryRecord>(&self, entities: Vec<T>) -> Result<Vec<T>, RepositoryError> {
        let mut tables = self.tables.lock()?;
        // Work on a copy so a failing entity leaves the tables untouched
        let mut staged = tables.clone();
        let saved = entities
            .into_iter()
            .map(|entity| put(&mut staged, entity))
            .collect::<Result<Vec<_>, _>>()?;
        *tables = staged;
        Ok(saved)
    }

    fn get<T: MemoryRecord>(&self, id: i64) -> Result<T, RepositoryError> {
        let tables = self.tables.lock()?;
        T::table(&tables)
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(T::KIND, id))
    }

    fn all<T: MemoryRecord>(&self) -> Result<Vec<T>, RepositoryError> {
        let tables = self.tables.lock()?;
        Ok(T::table(&tables).rows.values().cloned().collect())
    }

    fn remove<T: MemoryRecord>(&self, id: i64) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock()?;
        if !T::table(&tables).rows.contains_key(&id) {
            return Err(RepositoryError::not_found(T::KIND, id));
        }
        T::release_dependents(&mut tables, id, self.delete_policy)?;
        T::table_mut(&mut tables).rows.remove(&id);
        debug!("Deleted {} {} from memory", T::KIND, id);
        Ok(())
    }
}

#[async_trait]
impl<T: MemoryRecord> Repository<T> for InMemoryStorage {
    async fn save(&self, entity: T) -> Result<T, RepositoryError> {
        self.save_one(entity)
    }

    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>, RepositoryError> {
        self.save_many(entities)
    }

    async fn find_by_id(&self, id: i64) -> Result<T, RepositoryError> {
        self.get(id)
    }

    async fn find_all(&self) -> Result<Vec<T>, RepositoryError> {
        self.all()
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), RepositoryError> {
        self.remove::<T>(id)
    }
}

impl UserRepositoryTrait for InMemoryStorage {}

#[async_trait]
impl DeviceRepositoryTrait for InMemoryStorage {
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Device>, RepositoryError> {
        let tables = self.tables.lock()?;
        Ok(tables
            .devices
            .rows
            .values()
            .filter(|device| device.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HealthDataRepositoryTrait for InMemoryStorage {
    async fn find_filtered(&self, filter: &HealthDataFilter) -> Result<Vec<HealthData>, RepositoryError> {
        let tables = self.tables.lock()?;
        Ok(tables
            .health_data
            .rows
            .values()
            .filter(|record| filter.matches(record, tables.owner_of(record.device_id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StorageStatus for InMemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn check(&self) -> Result<String, RepositoryError> {
        let tables = self.tables.lock()?;
        Ok(format!(
            "In-memory storage ({} users, {} devices, {} health data records)",
            tables.users.rows.len(),
            tables.devices.rows.len(),
            tables.health_data.rows.len()
        ))
    }
}
