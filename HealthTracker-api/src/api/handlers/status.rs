use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use health_tracker_domain::status::{ComponentStatus, StatusServiceTrait, SystemHealth, SystemStatus};

/// Service type for dependency injection
pub type StatusService = Arc<dyn StatusServiceTrait>;

/// Service status report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// "ok", "degraded" or "error"
    pub status: String,
    /// Application version from the Cargo manifest
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the router was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    /// Value of `APP_ENV`, "development" when unset
    pub environment: String,
    pub components: BTreeMap<String, ComponentStatusResponse>,
}

/// Status of one component
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentStatusResponse {
    /// "ok", "degraded" or "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static SERVER_START: OnceCell<Instant> = OnceCell::new();

/// Record when the server started; later calls keep the first instant
pub fn initialize_server_start_time() {
    let _ = SERVER_START.set(Instant::now());
}

fn system_label(status: SystemStatus) -> &'static str {
    match status {
        SystemStatus::Healthy => "ok",
        SystemStatus::Degraded => "degraded",
        SystemStatus::Unhealthy => "error",
    }
}

fn component_label(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "ok",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "error",
    }
}

impl From<SystemHealth> for StatusResponse {
    fn from(health: SystemHealth) -> Self {
        let components = health
            .components
            .into_iter()
            .map(|(name, component)| {
                (
                    name,
                    ComponentStatusResponse {
                        status: component_label(component.status).to_string(),
                        message: component.details,
                    },
                )
            })
            .collect();

        Self {
            status: system_label(health.status).to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime: SERVER_START.get().map(|start| start.elapsed().as_secs()),
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            components,
        }
    }
}

/// Report whether storage and the completion API are usable
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service is healthy", body = StatusResponse),
        (status = 500, description = "Service is unhealthy", body = StatusResponse),
        (status = 503, description = "Service is degraded", body = StatusResponse)
    ),
    tag = "status"
)]
#[instrument(skip(service))]
pub async fn get_status(State(service): State<StatusService>) -> impl IntoResponse {
    info!("Status check requested");

    let health = service.get_system_health().await;
    let code = match health.status {
        SystemStatus::Healthy => StatusCode::OK,
        SystemStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        SystemStatus::Unhealthy => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code != StatusCode::OK {
        warn!("Service status is {}", system_label(health.status));
    }

    (code, Json(StatusResponse::from(health)))
}
