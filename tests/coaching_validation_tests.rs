// SPDX-License-Identifier: MIT

//! Coaching endpoint input validation (offline mock database).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

async fn post_rate(rating: u32) -> StatusCode {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let body = serde_json::json!({
        "nutritionist_id": "coach-1",
        "rating": rating
    });

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/coaching/rate")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
    .status()
}

#[tokio::test]
async fn test_rating_out_of_range_rejected() {
    assert_eq!(post_rate(0).await, StatusCode::BAD_REQUEST);
    assert_eq!(post_rate(6).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_in_range_reaches_database() {
    // Validation passes; the offline mock then fails the transaction.
    assert_eq!(post_rate(3).await, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_login_without_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
