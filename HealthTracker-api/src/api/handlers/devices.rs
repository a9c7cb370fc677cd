use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument};

use health_tracker_domain::entities::{RegisterDeviceRequest, SyncDeviceRequest};
use health_tracker_domain::services::DeviceServiceTrait;

use crate::api::extract::{ApiJson, ApiPath};
use crate::entities::{DeviceResponse, ErrorResponse};

/// Service type for dependency injection
pub type DeviceService = Arc<dyn DeviceServiceTrait>;

/// Register a device for a user
#[utoipa::path(
    post,
    path = "/devices",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 201, description = "Device registered", body = DeviceResponse),
        (status = 400, description = "Invalid request or unknown user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "devices"
)]
#[instrument(skip(service, request))]
pub async fn register_device(
    State(service): State<DeviceService>,
    ApiJson(request): ApiJson<RegisterDeviceRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Registering {} for user {}", request.device_type, request.user_id);

    let device = service.register_device(request).await?;
    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}

/// Get a device by ID
#[utoipa::path(
    get,
    path = "/devices/{id}",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Device found", body = DeviceResponse),
        (status = 400, description = "Invalid device ID", body = ErrorResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "devices"
)]
#[instrument(skip(service))]
pub async fn get_device(
    State(service): State<DeviceService>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let device = service.get_device(id).await?;
    Ok((StatusCode::OK, Json(DeviceResponse::from(device))))
}

/// Record a sync, optionally renaming the device
#[utoipa::path(
    put,
    path = "/devices/{id}/sync",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    request_body = SyncDeviceRequest,
    responses(
        (status = 200, description = "Device synced", body = DeviceResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "devices"
)]
#[instrument(skip(service, request))]
pub async fn sync_device(
    State(service): State<DeviceService>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<SyncDeviceRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Syncing device {}", id);

    let device = service.sync_device(id, request).await?;
    Ok((StatusCode::OK, Json(DeviceResponse::from(device))))
}

/// Delete a device
#[utoipa::path(
    delete,
    path = "/devices/{id}",
    params(
        ("id" = i64, Path, description = "Device ID")
    ),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 400, description = "Device still has measurements", body = ErrorResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "devices"
)]
#[instrument(skip(service))]
pub async fn delete_device(
    State(service): State<DeviceService>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Deleting device {}", id);

    service.delete_device(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Devices registered by a user
#[utoipa::path(
    get,
    path = "/users/{id}/devices",
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Devices of the user", body = Vec<DeviceResponse>),
        (status = 400, description = "Invalid user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "devices"
)]
#[instrument(skip(service))]
pub async fn list_user_devices(
    State(service): State<DeviceService>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let devices = service.list_user_devices(user_id).await?;
    let body: Vec<DeviceResponse> = devices.into_iter().map(DeviceResponse::from).collect();
    Ok((StatusCode::OK, Json(body)))
}
