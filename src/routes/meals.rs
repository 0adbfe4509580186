// SPDX-License-Identifier: MIT

//! Meal logging routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::consumption::{streak_signal, MealDraft};
use crate::models::{NutrientTotals, NutritionPlan};
use crate::time_utils::{now_rfc3339, previous_day};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logMeal/log-meal", post(log_meal))
        .route("/logMeal/daily-data/{uid}/{date}", get(daily_data))
}

#[derive(Serialize)]
pub struct LogMealResponse {
    pub message: String,
    pub totals: NutrientTotals,
}

/// Log a meal for the authenticated user.
///
/// Validation failures return 400 with every violated field itemized in
/// `details`. The increment-and-append is one Firestore transaction, so
/// concurrent logs for the same day cannot lose updates.
async fn log_meal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<MealDraft>,
) -> Result<Json<LogMealResponse>> {
    let (meal_type, date, meal) = draft
        .validate(&now_rfc3339())
        .map_err(AppError::Validation)?;

    let day = state
        .db
        .log_meal_atomic(&user.uid, &date, meal_type, meal)
        .await?;

    Ok(Json(LogMealResponse {
        message: "Meal logged".to_string(),
        totals: day.totals,
    }))
}

#[derive(Serialize)]
pub struct DailyDataResponse {
    pub date: String,
    pub nutrition_plan: NutritionPlan,
    pub totals: NutrientTotals,
    /// 0 = nothing logged today, 1 = today only, 2 = today and yesterday
    pub streak: u8,
}

/// Combined daily view: macro targets, the day's totals, and the streak
/// signal.
async fn daily_data(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((uid, date)): Path<(String, String)>,
) -> Result<Json<DailyDataResponse>> {
    if auth.uid != uid {
        return Err(AppError::Unauthorized);
    }

    if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
        return Err(AppError::BadRequest(
            "date must be a valid YYYY-MM-DD date".to_string(),
        ));
    }

    let user = state
        .db
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    let plan = user.nutrition_plan.unwrap_or_else(NutritionPlan::zeroed);

    let today = state.db.get_daily_consumption(&uid, &date).await?;
    let totals = today
        .as_ref()
        .map(|d| d.totals.clone())
        .unwrap_or_default();

    let logged_yesterday = match previous_day(&date) {
        Some(yesterday) => state
            .db
            .get_daily_consumption(&uid, &yesterday)
            .await?
            .is_some(),
        None => false,
    };

    Ok(Json(DailyDataResponse {
        date,
        nutrition_plan: plan,
        totals,
        streak: streak_signal(today.is_some(), logged_yesterday),
    }))
}
