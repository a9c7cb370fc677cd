//! Database connection module for the health tracker
//!
//! This module provides database configuration and connectivity for the
//! supported storage backends:
//! - SQLite (default), pooled through r2d2
//! - An in-process store for development and tests

use std::env;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "sqlite")]
use std::sync::Arc;
#[cfg(feature = "sqlite")]
use std::time::Duration;

use tracing::{info, warn};

use super::DatabaseError;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// SQLite database (file-based)
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// In-process storage, lost on restart
    Memory,
}

impl FromStr for DatabaseType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => Ok(DatabaseType::Sqlite),
            "memory" | "in-memory" => Ok(DatabaseType::Memory),
            _ => Err(DatabaseError::UnsupportedDatabaseType(s.to_string())),
        }
    }
}

/// What happens to dependent rows when a user or device is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse to delete a row that still has dependents
    #[default]
    Restrict,
    /// Delete dependents together with the row
    Cascade,
}

impl FromStr for DeletePolicy {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            _ => Err(DatabaseError::ConfigError(format!(
                "DB_DELETE_POLICY must be 'restrict' or 'cascade', got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::Restrict => f.write_str("restrict"),
            DeletePolicy::Cascade => f.write_str("cascade"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Storage backend
    pub db_type: DatabaseType,
    /// Path to SQLite database file
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
    /// Deletion behavior for users and devices with dependents
    pub delete_policy: DeletePolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            #[cfg(feature = "sqlite")]
            db_type: DatabaseType::Sqlite,
            #[cfg(not(feature = "sqlite"))]
            db_type: DatabaseType::Memory,
            sqlite_path: "data/health_tracker.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
            delete_policy: DeletePolicy::Restrict,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a configuration from an arbitrary key lookup.
    ///
    /// Unset, unparsable or zero numeric values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DatabaseError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_type = match lookup("DB_TYPE") {
            Some(value) => value.parse::<DatabaseType>()?,
            None => defaults.db_type,
        };

        let sqlite_path = lookup("DB_SQLITE_PATH").unwrap_or(defaults.sqlite_path);

        let max_connections = parse_positive_or_default(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections);
        let timeout_seconds = parse_positive_or_default(&lookup, "DB_TIMEOUT_SECONDS", defaults.timeout_seconds);

        let delete_policy = match lookup("DB_DELETE_POLICY") {
            Some(value) => value.parse::<DeletePolicy>()?,
            None => defaults.delete_policy,
        };

        info!(
            "Database configuration: type={:?}, max_connections={}, timeout={}s, delete_policy={}",
            db_type, max_connections, timeout_seconds, delete_policy
        );

        Ok(DatabaseConfig {
            db_type,
            sqlite_path,
            max_connections,
            timeout_seconds,
            delete_policy,
        })
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}='{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// Like `parse_or_default`, but zero also falls back; the pool rejects it
fn parse_positive_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display + Copy + PartialEq + Default,
{
    let value = parse_or_default(lookup, key, default);
    if value == T::default() {
        warn!("Ignoring {}=0, using {}", key, default);
        return default;
    }
    value
}

/// Pooled SQLite connections
#[cfg(feature = "sqlite")]
pub type DatabasePool = Arc<r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>>;

/// Initialize a SQLite connection pool and run migrations
#[cfg(feature = "sqlite")]
pub fn create_sqlite_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    use rusqlite::OpenFlags;
    use std::fs;
    use std::path::Path;

    info!("Initializing SQLite database at: {}", config.sqlite_path);

    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            fs::create_dir_all(parent)?;
        }
    }

    let busy_timeout = Duration::from_secs(config.timeout_seconds);
    let manager = r2d2_sqlite::SqliteConnectionManager::file(&config.sqlite_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)?;

    let conn = pool.get()?;
    super::migrations::run_sqlite_migrations(&conn)?;

    info!("SQLite connection pool created successfully");
    Ok(Arc::new(pool))
}

/// Initialize an in-memory SQLite database.
///
/// Every SQLite connection to `:memory:` opens its own database, so the pool
/// holds a single connection that is never recycled.
#[cfg(feature = "sqlite")]
pub fn create_in_memory_sqlite_pool() -> Result<DatabasePool, DatabaseError> {
    info!("Initializing in-memory SQLite database");

    let manager = r2d2_sqlite::SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = r2d2::Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)?;

    let conn = pool.get()?;
    super::migrations::run_sqlite_migrations(&conn)?;

    Ok(Arc::new(pool))
}

/// Check that a connection can be checked out and answers a trivial query
#[cfg(feature = "sqlite")]
pub fn check_connection(pool: &DatabasePool) -> Result<(), DatabaseError> {
    let conn = pool.get()?;
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}

/// Get information about a SQLite connection pool
#[cfg(feature = "sqlite")]
pub fn get_connection_info(pool: &DatabasePool) -> String {
    let location = match pool.get() {
        Ok(conn) => match conn.query_row("PRAGMA database_list", [], |row| row.get::<_, String>(2)) {
            Ok(path) if path.is_empty() || path == ":memory:" => "SQLite in-memory database".to_string(),
            Ok(path) => format!("SQLite database at {}", path),
            Err(_) => "SQLite database (path unknown)".to_string(),
        },
        Err(e) => return format!("SQLite connection error: {}", e),
    };

    let state = pool.state();
    format!(
        "{} (connections: active={}, idle={})",
        location, state.connections, state.idle_connections
    )
}
