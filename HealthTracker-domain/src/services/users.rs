use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use health_tracker_data::models::User;
use health_tracker_data::repository::UserRepositoryTrait;

use super::{validate_request, ServiceError};
use crate::entities::conversions;
use crate::entities::{CreateUserRequest, UpdateUserRequest};

/// Trait for user operations
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Create a new user
    async fn create_user(&self, request: CreateUserRequest) -> Result<User, ServiceError>;

    /// Update the username and/or role of a user
    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User, ServiceError>;

    /// Get a user by ID
    async fn get_user(&self, id: i64) -> Result<User, ServiceError>;

    /// List every user
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;

    /// Delete a user
    async fn delete_user(&self, id: i64) -> Result<(), ServiceError>;
}

/// User service backed by a user repository
pub struct UserService {
    users: Arc<dyn UserRepositoryTrait>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn create_user(&self, request: CreateUserRequest) -> Result<User, ServiceError> {
        validate_request(&request)?;
        let user = self.users.save(conversions::convert_to_data_user(request)).await?;
        info!("Created user {:?} ({})", user.id, user.username);
        Ok(user)
    }

    async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<User, ServiceError> {
        validate_request(&request)?;
        let existing = self.users.find_by_id(id).await?;
        let user = self.users.save(conversions::apply_user_update(existing, request)).await?;
        info!("Updated user {}", id);
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        debug!("Getting user {}", id);
        Ok(self.users.find_by_id(id).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.users.find_all().await?)
    }

    async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        self.users.delete_by_id(id).await?;
        info!("Deleted user {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_tracker_data::models::UserRole;
    use health_tracker_data::repository::InMemoryStorage;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryStorage::new()))
    }

    fn create(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults_role() {
        let service = service();
        let user = service.create_user(create("frank")).await.unwrap();
        assert_eq!(user.id, Some(1));
        assert_eq!(user.role, UserRole::User);
        assert_eq!(assert_ok!(service.get_user(1).await), user);
    }

    #[tokio::test]
    async fn test_create_user_rejects_short_username() {
        let err = service().create_user(create("fr")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("Username")));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_constraint_violation() {
        let service = service();
        assert_ok!(service.create_user(create("grace")).await);
        let err = service.create_user(create("grace")).await.unwrap_err();
        assert!(matches!(err, ServiceError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = service();
        let user = service.create_user(create("heidi")).await.unwrap();
        let id = user.id.unwrap();

        let updated = service
            .update_user(
                id,
                UpdateUserRequest {
                    username: Some("heidi2".to_string()),
                    role: Some(UserRole::Admin),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "heidi2");
        assert_eq!(updated.role, UserRole::Admin);

        assert_ok!(service.delete_user(id).await);
        assert!(matches!(service.get_user(id).await, Err(ServiceError::NotFound(_))));
        assert_err!(service.delete_user(id).await);
        assert!(service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_user_is_not_found() {
        let err = service()
            .update_user(9, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
