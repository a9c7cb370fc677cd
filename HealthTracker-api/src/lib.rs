// HealthTracker-api lib.rs
//
// HTTP layer of the health tracker: routing, handlers, response
// entities and the OpenAPI document.

pub mod api;
pub mod entities;
pub mod openapi;

pub use api::create_application;
