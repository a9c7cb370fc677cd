use axum::http::{Method, StatusCode};
use serde_json::json;

use super::*;

#[tokio::test]
async fn test_create_and_get_user() {
    let app = test_app();

    let (status, created) = send(&app, Method::POST, "/users", Some(json!({ "username": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["username"], "alice");
    assert_eq!(created["role"], "USER");

    let uri = format!("/users/{}", created["id"]);
    let (status, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let app = test_app();
    create_user(&app, "alice").await;

    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "username": "alice" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "constraint_violation");
}

#[tokio::test]
async fn test_short_username_fails_validation() {
    let app = test_app();

    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "username": "al" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_list_users() {
    let app = test_app();
    create_user(&app, "alice").await;
    create_user(&app, "bob").await;

    let (status, body) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["alice", "bob"]);
}

#[tokio::test]
async fn test_update_user() {
    let app = test_app();
    let id = create_user(&app, "alice").await;

    let uri = format!("/users/{}", id);
    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "role": "ADMIN" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["username"], "alice");

    let (status, _) = send(&app, Method::PUT, "/users/77", Some(json!({ "username": "nobody" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/users/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User with id 5 not found");
}

#[tokio::test]
async fn test_delete_user() {
    let app = test_app();
    let id = create_user(&app, "alice").await;
    let uri = format!("/users/{}", id);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_with_devices_depends_on_policy() {
    let restricted = test_app();
    let id = create_user(&restricted, "alice").await;
    register_device(&restricted, id, "PHONE").await;

    let (status, body) = send(&restricted, Method::DELETE, &format!("/users/{}", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "constraint_violation");

    let cascading = app_with(DeletePolicy::Cascade, Arc::new(StaticSummarizer::new(SUMMARY)));
    let id = create_user(&cascading, "alice").await;
    let device = register_device(&cascading, id, "PHONE").await;

    let (status, _) = send(&cascading, Method::DELETE, &format!("/users/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&cascading, Method::GET, &format!("/devices/{}", device), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
