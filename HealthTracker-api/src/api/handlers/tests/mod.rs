// Handler tests driving the full router over in-memory storage

mod users_test;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use health_tracker_domain::database::DeletePolicy;
use health_tracker_domain::testing::{in_memory_services, StaticSummarizer};

use crate::api::create_application;

pub const SUMMARY: &str = "Steady week: activity and air quality look normal.";

/// Router over fresh in-memory storage with the given delete policy
pub fn app_with(delete_policy: DeletePolicy, summarizer: Arc<StaticSummarizer>) -> Router {
    create_application(in_memory_services(delete_policy, summarizer))
}

pub fn test_app() -> Router {
    app_with(DeletePolicy::Restrict, Arc::new(StaticSummarizer::new(SUMMARY)))
}

/// Send one request and decode the JSON response body, `Value::Null` when empty
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// RFC 3339 timestamp `hours` in the past
pub fn hours_ago(hours: i64) -> String {
    (Utc::now() - Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn measurement(device_type: &str, data_type: &str, value: f64, measured_at: &str) -> Value {
    json!({
        "device_type": device_type,
        "data_type": data_type,
        "value_numeric": value,
        "measured_at": measured_at,
    })
}

/// Create a user and return its id
pub async fn create_user(app: &Router, username: &str) -> i64 {
    let (status, body) = send(app, Method::POST, "/users", Some(json!({ "username": username }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

/// Register a device for a user and return its id
pub async fn register_device(app: &Router, user_id: i64, device_type: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/devices",
        Some(json!({ "user_id": user_id, "device_type": device_type, "device_name": "Test device" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}
