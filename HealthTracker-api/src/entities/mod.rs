// Public entities for the HealthTracker API
// Response bodies and the shared error format

// Common entities for error handling
pub mod common;

pub mod devices;
pub mod health_data;
pub mod users;

pub use common::ErrorResponse;
pub use devices::DeviceResponse;
pub use health_data::{HealthDataByDeviceType, HealthDataResponse, SummaryResponse};
pub use users::UserResponse;
