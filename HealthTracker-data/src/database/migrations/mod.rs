// Schema migrations, applied idempotently whenever a pool is created

mod sqlite;
pub use sqlite::run_migrations as run_sqlite_migrations;
