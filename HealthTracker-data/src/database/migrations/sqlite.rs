use rusqlite::Connection;
use tracing::info;

use crate::database::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_users_table(conn)?;
    create_devices_table(conn)?;
    create_health_data_table(conn)?;
    create_health_data_indexes(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating users table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'USER'
        )",
        [],
    )
    .map_err(|e| DatabaseError::MigrationError(format!("users: {}", e)))?;

    Ok(())
}

fn create_devices_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating devices table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            device_type TEXT NOT NULL,
            device_name TEXT NOT NULL,
            registered_at TEXT NOT NULL,
            last_sync_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_devices_user_id ON devices (user_id);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("devices: {}", e)))?;

    Ok(())
}

fn create_health_data_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating health_data table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS health_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id INTEGER REFERENCES devices(id),
            device_type TEXT NOT NULL,
            measured_at TEXT NOT NULL,
            data_type TEXT NOT NULL,
            value_numeric REAL NOT NULL,
            value_text TEXT,
            unit TEXT,
            is_public INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .map_err(|e| DatabaseError::MigrationError(format!("health_data: {}", e)))?;

    Ok(())
}

/// Indexes backing the windowed queries by device type and visibility
fn create_health_data_indexes(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating health_data indexes");

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_health_data_type_measured
            ON health_data (device_type, measured_at);
        CREATE INDEX IF NOT EXISTS idx_health_data_public_measured
            ON health_data (is_public, measured_at);
        CREATE INDEX IF NOT EXISTS idx_health_data_device_id
            ON health_data (device_id);",
    )
    .map_err(|e| DatabaseError::MigrationError(format!("health_data indexes: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(tables, vec!["devices", "health_data", "users"]);
    }
}
