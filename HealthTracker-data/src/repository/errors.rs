use std::sync::PoisonError;
use thiserror::Error;
use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The requested id does not resolve to a stored entity
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// The id that did not resolve
        id: i64,
    },

    /// A foreign key, uniqueness or required-field constraint failed
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database setup error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection pool error
    #[cfg(feature = "sqlite")]
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),

    /// A blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl RepositoryError {
    /// Build a not-found error for an entity kind
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        RepositoryError::NotFound { entity, id }
    }
}

impl<T> From<PoisonError<T>> for RepositoryError {
    fn from(error: PoisonError<T>) -> Self {
        RepositoryError::Lock(error.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RepositoryError {
    fn from(error: rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RepositoryError::ConstraintViolation(
                    message.unwrap_or_else(|| failure.to_string()),
                )
            }
            other => RepositoryError::Sqlite(other),
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_sqlite_constraint_failures_become_constraint_violations() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT NOT NULL UNIQUE)").unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('a')", []).unwrap();

        let err: RepositoryError = conn
            .execute("INSERT INTO t (name) VALUES ('a')", [])
            .unwrap_err()
            .into();

        match err {
            RepositoryError::ConstraintViolation(message) => assert!(message.contains("UNIQUE")),
            other => panic!("expected constraint violation, got {:?}", other),
        }
    }

    #[test]
    fn test_other_sqlite_errors_are_kept() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepositoryError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::Sqlite(_)));
    }
}
