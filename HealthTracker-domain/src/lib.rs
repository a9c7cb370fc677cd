// HealthTracker Domain
// Business logic for the health tracker: aggregation, ingestion, users,
// devices and summaries

// Runtime configuration
pub mod config;

// Clients for external services
pub mod clients;

// Validated request entities
pub mod entities;

// Services that implement business logic
pub mod services;

// Service status checks
pub mod status;

// Re-export the data layer for convenience
pub use health_tracker_data::{database, models, repository};

pub use services::ServiceError;

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;
