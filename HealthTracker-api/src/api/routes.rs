use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::debug;

use health_tracker_domain::services::Services;

use crate::api::handlers::{devices, health_data, status, users};
use crate::openapi::configure_swagger_routes;

/// Create the application router
pub fn create_app(services: Services) -> Router {
    debug!("Creating application router");

    let health_routes = Router::new()
        // Static segments before the parametrized one
        .route("/health", get(health_data::get_health_data).post(health_data::ingest_health_data))
        .route("/health/public", get(health_data::get_public_health_data))
        .route("/health/summary", get(health_data::get_health_summary))
        .route("/health/:status", put(health_data::update_visibility))
        .route("/health-data", post(health_data::create_health_data))
        .route("/health-data/:user_id", get(health_data::get_user_health_data))
        .route("/devices/:id/health-data", get(health_data::get_device_health_data))
        .with_state(services.health_data);

    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .with_state(services.users);

    let device_routes = Router::new()
        .route("/devices", post(devices::register_device))
        .route("/devices/:id", get(devices::get_device).delete(devices::delete_device))
        .route("/devices/:id/sync", put(devices::sync_device))
        .route("/users/:id/devices", get(devices::list_user_devices))
        .with_state(services.devices);

    let status_routes = Router::new()
        .route("/status", get(status::get_status))
        .with_state(services.status);

    debug!("API routes configured");

    let app = Router::new()
        .merge(health_routes)
        .merge(user_routes)
        .merge(device_routes)
        .merge(status_routes)
        .merge(configure_swagger_routes());

    status::initialize_server_start_time();

    configure_middleware(app)
}

/// Tracing, CORS and security headers shared by every route
fn configure_middleware(app: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    app.layer(security_headers)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
