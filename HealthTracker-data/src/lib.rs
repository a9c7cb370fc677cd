// HealthTracker Data
// Storage models, database connectivity and repositories

// Database connection management
pub mod database;

// Repository contracts and backends
pub mod repository;

// Data storage models
pub mod models;
