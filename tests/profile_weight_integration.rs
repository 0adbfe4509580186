// SPDX-License-Identifier: MIT

//! Weight logging against the Firestore emulator: the entry and the profile
//! weight are written together or not at all.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bitewise_api::models::User;
use bitewise_api::time_utils::now_rfc3339;
use tower::ServiceExt;

mod common;

async fn post_weight(
    app: axum::Router,
    token: &str,
    body: serde_json::Value,
) -> axum::http::Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/profile/weight")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_log_weight_unknown_user_writes_nothing() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let uid = common::unique_id("ghost-weight-user");
    let token = common::create_test_jwt(&uid, &state.config.jwt_signing_key);

    let response = post_weight(
        app,
        &token,
        serde_json::json!({ "date": "2026-08-26", "weight_kg": 81.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The failed transaction must not leave an orphaned history entry
    let history = state.db.get_weight_history(&uid).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_log_weight_updates_history_and_profile() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let uid = common::unique_id("weight-user");
    let token = common::create_test_jwt(&uid, &state.config.jwt_signing_key);

    let user = User {
        uid: uid.clone(),
        email: "weight@example.com".to_string(),
        first_name: "Weight".to_string(),
        last_name: "Logger".to_string(),
        weight_kg: Some(80.0),
        height_cm: Some(180.0),
        age: Some(30),
        gender: Some("male".to_string()),
        goal: Some("Losing Weight".to_string()),
        activity_level: Some("Lightly Active".to_string()),
        dietary_preferences: vec![],
        nutrition_plan: None,
        active_coach_id: None,
        created_at: now_rfc3339(),
    };
    state.db.upsert_user(&user).await.unwrap();

    let response = post_weight(
        app.clone(),
        &token,
        serde_json::json!({ "date": "2026-08-26", "weight_kg": 78.2 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let history = state.db.get_weight_history(&uid).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].date, "2026-08-26");
    assert_eq!(history[0].weight_kg, 78.2);

    let stored = state.db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(stored.weight_kg, Some(78.2));

    // Re-logging the same date overwrites instead of appending
    let response = post_weight(
        app,
        &token,
        serde_json::json!({ "date": "2026-08-26", "weight_kg": 77.9 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let history = state.db.get_weight_history(&uid).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].weight_kg, 77.9);
}
