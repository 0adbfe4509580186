// SPDX-License-Identifier: MIT

//! Daily aggregate endpoint against the Firestore emulator: plan fallback,
//! totals summation, and the streak signal.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bitewise_api::models::consumption::{LoggedMeal, MealType};
use bitewise_api::models::User;
use bitewise_api::time_utils::now_rfc3339;
use tower::ServiceExt;

mod common;

fn meal(title: &str, calories: f64) -> LoggedMeal {
    LoggedMeal {
        logged_at: now_rfc3339(),
        source: "manual".to_string(),
        recipe_id: None,
        title: title.to_string(),
        calories,
        protein: 10.0,
        carbs: 20.0,
        fat: 5.0,
        fiber: 4.0,
        image_url: None,
    }
}

async fn get_daily(app: axum::Router, token: &str, uid: &str, date: &str) -> serde_json::Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!("/logMeal/daily-data/{}/{}", uid, date))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_daily_data_totals_and_streak() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let uid = common::unique_id("daily-data-user");
    let token = common::create_test_jwt(&uid, &state.config.jwt_signing_key);

    let user = User {
        uid: uid.clone(),
        email: "daily@example.com".to_string(),
        first_name: "Daily".to_string(),
        last_name: "Data".to_string(),
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

    let today = "2026-08-26";
    let yesterday = "2026-08-25";

    // No logs yet: zeroed plan fallback, zeroed totals, streak 0
    let json = get_daily(app.clone(), &token, &uid, today).await;
    assert_eq!(json["streak"], 0);
    assert_eq!(json["totals"]["calories"], 0.0);
    assert_eq!(json["nutrition_plan"]["calories"], 0);

    // Two meals today: totals are the exact sum
    state
        .db
        .log_meal_atomic(&uid, today, MealType::Breakfast, meal("Oatmeal", 350.0))
        .await
        .unwrap();
    state
        .db
        .log_meal_atomic(&uid, today, MealType::Lunch, meal("Salad", 450.0))
        .await
        .unwrap();

    let json = get_daily(app.clone(), &token, &uid, today).await;
    assert_eq!(json["streak"], 1);
    assert_eq!(json["totals"]["calories"], 800.0);
    assert_eq!(json["totals"]["protein"], 20.0);

    // A log yesterday upgrades the signal to 2
    state
        .db
        .log_meal_atomic(&uid, yesterday, MealType::Dinner, meal("Pasta", 600.0))
        .await
        .unwrap();

    let json = get_daily(app.clone(), &token, &uid, today).await;
    assert_eq!(json["streak"], 2);

    // Recomputing the plan makes the worked-example targets appear
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(&format!("/nutritionPlan/{}", uid))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_daily(app, &token, &uid, today).await;
    assert_eq!(json["nutrition_plan"]["calories"], 1948);
    assert_eq!(json["nutrition_plan"]["protein_g"], 120);
}
