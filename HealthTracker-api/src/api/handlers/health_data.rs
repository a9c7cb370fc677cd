use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{info, instrument};

use health_tracker_domain::entities::{HealthDataQuery, HealthDataRequest};
use health_tracker_domain::services::HealthDataServiceTrait;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::entities::health_data::to_responses;
use crate::entities::{ErrorResponse, HealthDataByDeviceType, HealthDataResponse, SummaryResponse};

/// Service type for dependency injection
pub type HealthDataService = Arc<dyn HealthDataServiceTrait>;

/// Recent measurements of every tracked device type
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Recent measurements grouped by device type", body = HealthDataByDeviceType),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn get_health_data(
    State(service): State<HealthDataService>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Fetching recent health data");

    let grouped = service.fetch_health_data().await?;
    Ok((StatusCode::OK, Json(HealthDataByDeviceType::from(grouped))))
}

/// Store a batch of measurements; either all are stored or none
#[utoipa::path(
    post,
    path = "/health",
    request_body = Vec<HealthDataRequest>,
    responses(
        (status = 201, description = "Measurements stored", body = Vec<HealthDataResponse>),
        (status = 400, description = "Invalid measurement or unknown device", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service, requests))]
pub async fn ingest_health_data(
    State(service): State<HealthDataService>,
    ApiJson(requests): ApiJson<Vec<HealthDataRequest>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Ingesting {} measurements", requests.len());

    let stored = service.ingest(requests).await?;
    Ok((StatusCode::CREATED, Json(to_responses(stored))))
}

/// Set the visibility of every stored measurement
#[utoipa::path(
    put,
    path = "/health/{status}",
    params(
        ("status" = bool, Path, description = "New visibility, `true` or `false`")
    ),
    responses(
        (status = 200, description = "All measurements updated", body = Vec<HealthDataResponse>),
        (status = 400, description = "Status is not a boolean", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn update_visibility(
    State(service): State<HealthDataService>,
    ApiPath(is_public): ApiPath<bool>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Setting visibility of all health data to {}", is_public);

    let updated = service.update_visibility(is_public).await?;
    Ok((StatusCode::OK, Json(to_responses(updated))))
}

/// Recent measurements that were made public
#[utoipa::path(
    get,
    path = "/health/public",
    responses(
        (status = 200, description = "Recent public measurements", body = Vec<HealthDataResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn get_public_health_data(
    State(service): State<HealthDataService>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Fetching public health data");

    let public = service.fetch_public_data().await?;
    Ok((StatusCode::OK, Json(to_responses(public))))
}

/// Natural-language summary of the recent measurements
#[utoipa::path(
    get,
    path = "/health/summary",
    responses(
        (status = 200, description = "Summary text, or the fallback text when no summary is available", body = SummaryResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn get_health_summary(
    State(service): State<HealthDataService>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Summarizing recent health data");

    let summary = service.summarize().await?;
    Ok((StatusCode::OK, Json(SummaryResponse { summary })))
}

/// Store a single measurement
#[utoipa::path(
    post,
    path = "/health-data",
    request_body = HealthDataRequest,
    responses(
        (status = 201, description = "Measurement stored", body = HealthDataResponse),
        (status = 400, description = "Invalid measurement or unknown device", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service, request))]
pub async fn create_health_data(
    State(service): State<HealthDataService>,
    ApiJson(request): ApiJson<HealthDataRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Storing a {:?} measurement", request.data_type);

    let stored = service.ingest_one(request).await?;
    Ok((StatusCode::CREATED, Json(HealthDataResponse::from(stored))))
}

/// Measurements recorded by the devices of a user
#[utoipa::path(
    get,
    path = "/health-data/{user_id}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        HealthDataQuery
    ),
    responses(
        (status = 200, description = "Measurements of the user", body = Vec<HealthDataResponse>),
        (status = 400, description = "Invalid user ID or query", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn get_user_health_data(
    State(service): State<HealthDataService>,
    ApiPath(user_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<HealthDataQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Fetching health data of user {}", user_id);

    let records = service.fetch_user_health_data(user_id, query).await?;
    Ok((StatusCode::OK, Json(to_responses(records))))
}

/// Measurements recorded by one device
#[utoipa::path(
    get,
    path = "/devices/{id}/health-data",
    params(
        ("id" = i64, Path, description = "Device ID"),
        HealthDataQuery
    ),
    responses(
        (status = 200, description = "Measurements of the device", body = Vec<HealthDataResponse>),
        (status = 400, description = "Invalid device ID or query", body = ErrorResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "health_data"
)]
#[instrument(skip(service))]
pub async fn get_device_health_data(
    State(service): State<HealthDataService>,
    ApiPath(device_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<HealthDataQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    info!("Fetching health data of device {}", device_id);

    let records = service.fetch_device_health_data(device_id, query).await?;
    Ok((StatusCode::OK, Json(to_responses(records))))
}
