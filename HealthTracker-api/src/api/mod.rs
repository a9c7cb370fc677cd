pub mod extract;
pub mod handlers;
pub mod routes;

use axum::Router;

use health_tracker_domain::services::Services;

/// Create the application router over a set of services
pub fn create_application(services: Services) -> Router {
    routes::create_app(services)
}
