use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use health_tracker_domain::models::{User, UserRole};

/// A user as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            username: user.username,
            role: user.role,
        }
    }
}
