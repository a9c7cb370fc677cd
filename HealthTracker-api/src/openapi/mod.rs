use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health data endpoints
        crate::api::handlers::health_data::get_health_data,
        crate::api::handlers::health_data::ingest_health_data,
        crate::api::handlers::health_data::update_visibility,
        crate::api::handlers::health_data::get_public_health_data,
        crate::api::handlers::health_data::get_health_summary,
        crate::api::handlers::health_data::create_health_data,
        crate::api::handlers::health_data::get_user_health_data,
        crate::api::handlers::health_data::get_device_health_data,

        // User endpoints
        crate::api::handlers::users::create_user,
        crate::api::handlers::users::list_users,
        crate::api::handlers::users::get_user,
        crate::api::handlers::users::update_user,
        crate::api::handlers::users::delete_user,

        // Device endpoints
        crate::api::handlers::devices::register_device,
        crate::api::handlers::devices::get_device,
        crate::api::handlers::devices::sync_device,
        crate::api::handlers::devices::delete_device,
        crate::api::handlers::devices::list_user_devices,

        // Status endpoint
        crate::api::handlers::status::get_status
    ),
    components(
        schemas(
            // Response entities
            crate::entities::ErrorResponse,
            crate::entities::UserResponse,
            crate::entities::DeviceResponse,
            crate::entities::HealthDataResponse,
            crate::entities::HealthDataByDeviceType,
            crate::entities::SummaryResponse,
            crate::api::handlers::status::StatusResponse,
            crate::api::handlers::status::ComponentStatusResponse,

            // Request entities
            health_tracker_domain::entities::CreateUserRequest,
            health_tracker_domain::entities::UpdateUserRequest,
            health_tracker_domain::entities::RegisterDeviceRequest,
            health_tracker_domain::entities::SyncDeviceRequest,
            health_tracker_domain::entities::HealthDataRequest,

            // Enumerations
            health_tracker_domain::models::UserRole,
            health_tracker_domain::models::DeviceType,
            health_tracker_domain::models::DataType
        )
    ),
    tags(
        (name = "health_data", description = "Measurement ingestion, aggregation and visibility"),
        (name = "users", description = "User management"),
        (name = "devices", description = "Device registration and sync"),
        (name = "status", description = "Service status")
    ),
    info(
        title = "HealthTracker API",
        version = "0.1.0",
        description = "API for collecting device measurements and summarizing recent health data",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;
