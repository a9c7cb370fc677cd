use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, error};

use super::errors::RepositoryError;
use super::{
    DeviceRepositoryTrait, Entity, HealthDataFilter, HealthDataRepositoryTrait, Repository, StorageStatus,
    UserRepositoryTrait,
};
use crate::database::{check_connection, get_connection_info, DatabasePool, DeletePolicy};
use crate::models::{format_timestamp, parse_timestamp, Device, HealthData, User};

const HEALTH_DATA_COLUMNS: &str =
    "id, device_id, device_type, measured_at, data_type, value_numeric, value_text, unit, is_public";

fn text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        parse_timestamp(&value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Row mapping and SQL for one entity kind
pub trait SqliteRecord: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Insert the row and return its new id
    fn insert(&self, conn: &Connection) -> Result<i64, RepositoryError>;

    /// Update the row with the given id, returning the number of rows changed
    fn update(&self, id: i64, conn: &Connection) -> Result<usize, RepositoryError>;

    /// Remove or refuse dependents of the row about to be deleted
    fn release_dependents(_conn: &Connection, _id: i64, _policy: DeletePolicy) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl SqliteRecord for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, username, role";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            role: text_column(row, 2)?,
        })
    }

    fn insert(&self, conn: &Connection) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT INTO users (username, role) VALUES (?1, ?2)",
            params![self.username, self.role.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, conn: &Connection) -> Result<usize, RepositoryError> {
        Ok(conn.execute(
            "UPDATE users SET username = ?1, role = ?2 WHERE id = ?3",
            params![self.username, self.role.as_str(), id],
        )?)
    }

    fn release_dependents(conn: &Connection, id: i64, policy: DeletePolicy) -> Result<(), RepositoryError> {
        let devices: i64 = conn.query_row("SELECT COUNT(*) FROM devices WHERE user_id = ?1", [id], |row| row.get(0))?;
        if devices == 0 {
            return Ok(());
        }

        match policy {
            DeletePolicy::Restrict => Err(RepositoryError::ConstraintViolation(format!(
                "User {} still owns {} device(s)",
                id, devices
            ))),
            DeletePolicy::Cascade => {
                conn.execute(
                    "DELETE FROM health_data WHERE device_id IN (SELECT id FROM devices WHERE user_id = ?1)",
                    [id],
                )?;
                conn.execute("DELETE FROM devices WHERE user_id = ?1", [id])?;
                Ok(())
            }
        }
    }
}

impl SqliteRecord for Device {
    const TABLE: &'static str = "devices";
    const COLUMNS: &'static str = "id, user_id, device_type, device_name, registered_at, last_sync_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Device {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            device_type: text_column(row, 2)?,
            device_name: row.get(3)?,
            registered_at: timestamp_column(row, 4)?,
            last_sync_at: optional_timestamp_column(row, 5)?,
        })
    }

    fn insert(&self, conn: &Connection) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT INTO devices (user_id, device_type, device_name, registered_at, last_sync_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.user_id,
                self.device_type.as_str(),
                self.device_name,
                format_timestamp(&self.registered_at),
                self.last_sync_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, conn: &Connection) -> Result<usize, RepositoryError> {
        Ok(conn.execute(
            "UPDATE devices SET user_id = ?1, device_type = ?2, device_name = ?3, registered_at = ?4, last_sync_at = ?5
             WHERE id = ?6",
            params![
                self.user_id,
                self.device_type.as_str(),
                self.device_name,
                format_timestamp(&self.registered_at),
                self.last_sync_at.as_ref().map(format_timestamp),
                id,
            ],
        )?)
    }

    fn release_dependents(conn: &Connection, id: i64, policy: DeletePolicy) -> Result<(), RepositoryError> {
        let readings: i64 =
            conn.query_row("SELECT COUNT(*) FROM health_data WHERE device_id = ?1", [id], |row| row.get(0))?;
        if readings == 0 {
            return Ok(());
        }

        match policy {
            DeletePolicy::Restrict => Err(RepositoryError::ConstraintViolation(format!(
                "Device {} still has {} health data record(s)",
                id, readings
            ))),
            DeletePolicy::Cascade => {
                conn.execute("DELETE FROM health_data WHERE device_id = ?1", [id])?;
                Ok(())
            }
        }
    }
}

impl SqliteRecord for HealthData {
    const TABLE: &'static str = "health_data";
    const COLUMNS: &'static str = HEALTH_DATA_COLUMNS;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(HealthData {
            id: Some(row.get(0)?),
            device_id: row.get(1)?,
            device_type: text_column(row, 2)?,
            measured_at: timestamp_column(row, 3)?,
            data_type: text_column(row, 4)?,
            value_numeric: row.get(5)?,
            value_text: row.get(6)?,
            unit: row.get(7)?,
            is_public: row.get(8)?,
        })
    }

    fn insert(&self, conn: &Connection) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT INTO health_data (device_id, device_type, measured_at, data_type, value_numeric, value_text, unit, is_public)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.device_id,
                self.device_type.as_str(),
                format_timestamp(&self.measured_at),
                self.data_type.as_str(),
                self.value_numeric,
                self.value_text,
                self.unit,
                self.is_public,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, conn: &Connection) -> Result<usize, RepositoryError> {
        Ok(conn.execute(
            "UPDATE health_data SET device_id = ?1, device_type = ?2, measured_at = ?3, data_type = ?4,
                value_numeric = ?5, value_text = ?6, unit = ?7, is_public = ?8
             WHERE id = ?9",
            params![
                self.device_id,
                self.device_type.as_str(),
                format_timestamp(&self.measured_at),
                self.data_type.as_str(),
                self.value_numeric,
                self.value_text,
                self.unit,
                self.is_public,
                id,
            ],
        )?)
    }
}

fn write<T: SqliteRecord>(conn: &Connection, mut entity: T) -> Result<T, RepositoryError> {
    match entity.id() {
        Some(id) => {
            if entity.update(id, conn)? == 0 {
                return Err(RepositoryError::not_found(T::KIND, id));
            }
        }
        None => {
            let id = entity.insert(conn)?;
            entity.set_id(id);
        }
    }
    Ok(entity)
}

/// Build the query for a health data filter.
///
/// Timestamps are stored as fixed-width text, so range checks compare strings.
fn filtered_query(filter: &HealthDataFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut sql = format!("SELECT {} FROM health_data", HEALTH_DATA_COLUMNS);
    let mut where_clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(device_type) = filter.device_type {
        where_clauses.push("device_type = ?");
        values.push(Box::new(device_type.as_str()));
    }
    if let Some(device_id) = filter.device_id {
        where_clauses.push("device_id = ?");
        values.push(Box::new(device_id));
    }
    if let Some(user_id) = filter.user_id {
        where_clauses.push("device_id IN (SELECT id FROM devices WHERE user_id = ?)");
        values.push(Box::new(user_id));
    }
    if let Some(data_type) = filter.data_type {
        where_clauses.push("data_type = ?");
        values.push(Box::new(data_type.as_str()));
    }
    if let Some(is_public) = filter.is_public {
        where_clauses.push("is_public = ?");
        values.push(Box::new(is_public));
    }
    if let Some(from) = &filter.measured_from {
        where_clauses.push("measured_at >= ?");
        values.push(Box::new(format_timestamp(from)));
    }
    if let Some(to) = &filter.measured_to {
        where_clauses.push("measured_at <= ?");
        values.push(Box::new(format_timestamp(to)));
    }

    if !where_clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY id");

    (sql, values)
}

/// SQLite-backed storage for every entity kind
#[derive(Clone)]
pub struct SqliteStorage {
    pool: DatabasePool,
    delete_policy: DeletePolicy,
}

impl SqliteStorage {
    pub fn new(pool: DatabasePool, delete_policy: DeletePolicy) -> Self {
        Self { pool, delete_policy }
    }

    /// Run blocking SQLite work on a pooled connection off the async runtime
    async fn run<F, R>(&self, work: F) -> Result<R, RepositoryError>
    where
        F: FnOnce(&mut Connection) -> Result<R, RepositoryError> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            work(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("SQLite task failed: {}", e);
            RepositoryError::Task(e.to_string())
        })?
    }

    async fn save_one<T: SqliteRecord>(&self, entity: T) -> Result<T, RepositoryError> {
        self.run(move |conn| write(conn, entity)).await
    }

    async fn save_many<T: SqliteRecord>(&self, entities: Vec<T>) -> Result<Vec<T>, RepositoryError> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let saved = entities
                .into_iter()
                .map(|entity| write(&tx, entity))
                .collect::<Result<Vec<_>, _>>()?;
            tx.commit()?;
            debug!("Saved {} {} row(s) in one transaction", saved.len(), T::TABLE);
            Ok(saved)
        })
        .await
    }

    async fn get<T: SqliteRecord>(&self, id: i64) -> Result<T, RepositoryError> {
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM {} WHERE id = ?1", T::COLUMNS, T::TABLE);
            conn.query_row(&sql, [id], T::from_row)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found(T::KIND, id))
        })
        .await
    }

    async fn all<T: SqliteRecord>(&self) -> Result<Vec<T>, RepositoryError> {
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM {} ORDER BY id", T::COLUMNS, T::TABLE);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], T::from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn remove<T: SqliteRecord>(&self, id: i64) -> Result<(), RepositoryError> {
        let policy = self.delete_policy;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let exists: Option<i64> = tx
                .query_row(&format!("SELECT id FROM {} WHERE id = ?1", T::TABLE), [id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Err(RepositoryError::not_found(T::KIND, id));
            }

            T::release_dependents(&tx, id, policy)?;
            tx.execute(&format!("DELETE FROM {} WHERE id = ?1", T::TABLE), [id])?;
            tx.commit()?;
            debug!("Deleted {} {}", T::KIND, id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl<T: SqliteRecord> Repository<T> for SqliteStorage {
    async fn save(&self, entity: T) -> Result<T, RepositoryError> {
        self.save_one(entity).await
    }

    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>, RepositoryError> {
        self.save_many(entities).await
    }

    async fn find_by_id(&self, id: i64) -> Result<T, RepositoryError> {
        self.get(id).await
    }

    async fn find_all(&self) -> Result<Vec<T>, RepositoryError> {
        self.all().await
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), RepositoryError> {
        self.remove::<T>(id).await
    }
}

impl UserRepositoryTrait for SqliteStorage {}

#[async_trait]
impl DeviceRepositoryTrait for SqliteStorage {
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Device>, RepositoryError> {
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM devices WHERE user_id = ?1 ORDER BY id", Device::COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([user_id], Device::from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}

#[async_trait]
impl HealthDataRepositoryTrait for SqliteStorage {
    async fn find_filtered(&self, filter: &HealthDataFilter) -> Result<Vec<HealthData>, RepositoryError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let (sql, values) = filtered_query(&filter);
            debug!("Filtered health data query: {}", sql);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), HealthData::from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}

#[async_trait]
impl StorageStatus for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn check(&self) -> Result<String, RepositoryError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<String, RepositoryError> {
            check_connection(&pool)?;
            Ok(get_connection_info(&pool))
        })
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
    }
}
