use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument};

use health_tracker_domain::entities::{CreateUserRequest, UpdateUserRequest};
use health_tracker_domain::services::UserServiceTrait;

use crate::api::extract::{ApiJson, ApiPath};
use crate::entities::{ErrorResponse, UserResponse};

/// Service type for dependency injection
pub type UserService = Arc<dyn UserServiceTrait>;

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request or username taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service, request))]
pub async fn create_user(
    State(service): State<UserService>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Creating user {}", request.username);

    let user = service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// List every user
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service))]
pub async fn list_users(State(service): State<UserService>) -> Result<impl IntoResponse, ErrorResponse> {
    let users = service.list_users().await?;
    let body: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok((StatusCode::OK, Json(body)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Invalid user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service))]
pub async fn get_user(
    State(service): State<UserService>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let user = service.get_user(id).await?;
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

/// Change the username or role of a user
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid request or username taken", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service, request))]
pub async fn update_user(
    State(service): State<UserService>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Updating user {}", id);

    let user = service.update_user(id, request).await?;
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "User still owns devices", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip(service))]
pub async fn delete_user(
    State(service): State<UserService>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Deleting user {}", id);

    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
