// Domain services
// Business logic on top of the repositories.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use validator::{Validate, ValidationErrors};

use health_tracker_data::repository::{Repositories, RepositoryError};

use crate::clients::Summarizer;
use crate::config::AggregationConfig;
use crate::status::{StatusService, StatusServiceTrait};

pub mod devices;
pub mod health_data;
pub mod users;

pub use devices::{DeviceService, DeviceServiceTrait};
pub use health_data::{HealthDataService, HealthDataServiceTrait};
pub use users::{UserService, UserServiceTrait};

/// Every service the API exposes, sharing one storage backend
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserServiceTrait>,
    pub devices: Arc<dyn DeviceServiceTrait>,
    pub health_data: Arc<dyn HealthDataServiceTrait>,
    pub status: Arc<dyn StatusServiceTrait>,
}

/// Wire the services over a set of repositories and a summarizer
pub fn create_services(
    repositories: Repositories,
    summarizer: Arc<dyn Summarizer>,
    aggregation: AggregationConfig,
) -> Services {
    Services {
        users: Arc::new(UserService::new(repositories.users.clone())),
        devices: Arc::new(DeviceService::new(
            repositories.devices.clone(),
            repositories.users.clone(),
        )),
        health_data: Arc::new(HealthDataService::new(
            repositories.health_data,
            repositories.devices,
            repositories.users,
            summarizer.clone(),
            aggregation,
        )),
        status: Arc::new(StatusService::new(repositories.status, summarizer)),
    }
}

/// Errors returned by every domain service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A reference, uniqueness or delete constraint failed
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The request is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failed for an infrastructure reason
    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            RepositoryError::ConstraintViolation(msg) => ServiceError::ConstraintViolation(msg),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

/// Run the validator derive on a request and flatten its messages
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<(), ServiceError> {
    request.validate().map_err(|errors| {
        let message = describe_validation_errors(&errors);
        warn!("Rejected request: {}", message);
        ServiceError::Validation(message)
    })
}

fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    // field_errors is a HashMap; sort for stable messages
    fields.sort();
    fields.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "name is too short"))]
        name: String,
        #[validate(required)]
        value: Option<f64>,
    }

    #[test]
    fn test_validation_messages_are_flattened() {
        let sample = Sample {
            name: "x".to_string(),
            value: None,
        };
        match validate_request(&sample) {
            Err(ServiceError::Validation(message)) => {
                assert_eq!(message, "name: name is too short; value: Invalid value");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        let not_found: ServiceError = RepositoryError::not_found("User", 4).into();
        assert!(matches!(not_found, ServiceError::NotFound(msg) if msg == "User with id 4 not found"));

        let constraint: ServiceError = RepositoryError::ConstraintViolation("dup".to_string()).into();
        assert!(matches!(constraint, ServiceError::ConstraintViolation(msg) if msg == "dup"));

        let other: ServiceError = RepositoryError::Lock("poisoned".to_string()).into();
        assert!(matches!(other, ServiceError::Repository(_)));
    }
}
