use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use health_tracker_api::create_application;
use health_tracker_data::database::{create_in_memory_sqlite_pool, DeletePolicy};
use health_tracker_data::repository::{Repositories, SqliteStorage};
use health_tracker_domain::config::AggregationConfig;
use health_tracker_domain::services::create_services;
use health_tracker_domain::testing::StaticSummarizer;

// Ensure tracing is initialized only once
static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn sqlite_app(delete_policy: DeletePolicy) -> Router {
    initialize();
    let pool = create_in_memory_sqlite_pool().unwrap();
    let repositories = Repositories::from_storage(SqliteStorage::new(pool, delete_policy));
    let services = create_services(
        repositories,
        Arc::new(StaticSummarizer::new("Quiet week.")),
        AggregationConfig::default(),
    );
    create_application(services)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_full_flow_over_sqlite() {
    let app = sqlite_app(DeletePolicy::Restrict);

    let (status, user) = call(&app, Method::POST, "/users", Some(json!({ "username": "dana" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_i64().unwrap();

    let (status, device) = call(
        &app,
        Method::POST,
        "/devices",
        Some(json!({ "user_id": user_id, "device_type": "HEALTH_HUB", "device_name": "Kitchen hub" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let device_id = device["id"].as_i64().unwrap();

    let recent = (Utc::now() - Duration::hours(5)).to_rfc3339();
    let stale = (Utc::now() - Duration::days(10)).to_rfc3339();
    let batch = json!([
        { "device_id": device_id, "data_type": "AIR_QUALITY", "value_numeric": 37.0, "measured_at": recent },
        { "device_id": device_id, "data_type": "CO2", "value_numeric": 820.0, "unit": "ppm", "measured_at": stale },
    ]);
    let (status, stored) = call(&app, Method::POST, "/health", Some(batch)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored.as_array().unwrap().len(), 2);
    assert!(stored.as_array().unwrap().iter().all(|r| r["device_type"] == "HEALTH_HUB"));

    let (status, grouped) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grouped["HEALTH_HUB"].as_array().unwrap().len(), 1);
    assert_eq!(grouped["HEALTH_HUB"][0]["data_type"], "AIR_QUALITY");

    // The user's history is not limited to the recent window
    let (status, history) = call(&app, Method::GET, &format!("/health-data/{}", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[1]["unit"], "ppm");

    let (status, public) = call(&app, Method::GET, "/health/public", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public, json!([]));

    let (status, updated) = call(&app, Method::PUT, "/health/true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated.as_array().unwrap().len(), 2);
    assert!(updated.as_array().unwrap().iter().all(|r| r["is_public"] == true));

    // Only the record inside the window is listed, though both are public now
    let (status, public) = call(&app, Method::GET, "/health/public", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert_eq!(public[0]["data_type"], "AIR_QUALITY");
    assert_eq!(public[0]["is_public"], true);

    let (status, _) = call(&app, Method::DELETE, &format!("/devices/{}", device_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_cascade_delete_over_sqlite() {
    let app = sqlite_app(DeletePolicy::Cascade);

    let (_, user) = call(&app, Method::POST, "/users", Some(json!({ "username": "erin" }))).await;
    let user_id = user["id"].as_i64().unwrap();
    let (_, device) = call(
        &app,
        Method::POST,
        "/devices",
        Some(json!({ "user_id": user_id, "device_type": "SMARTWATCH", "device_name": "Watch" })),
    )
    .await;
    let record = json!({
        "device_id": device["id"],
        "data_type": "STEPS",
        "value_numeric": 1200.0,
        "measured_at": Utc::now().to_rfc3339(),
    });
    let (status, _) = call(&app, Method::POST, "/health-data", Some(record)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(&app, Method::DELETE, &format!("/users/{}", user_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, grouped) = call(&app, Method::GET, "/health", None).await;
    assert!(grouped["SMARTWATCH"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = sqlite_app(DeletePolicy::Restrict);

    let (status, _) = call(&app, Method::GET, "/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
