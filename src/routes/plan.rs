// SPDX-License-Identifier: MIT

//! Nutrition plan routes.

use axum::{
    extract::{Path, State},
    routing::put,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::plan::{calculate_plan, ActivityLevel, Biometrics, Gender, Goal};
use crate::models::NutritionPlan;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/nutritionPlan/{uid}", put(recompute_plan).get(get_plan))
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub message: String,
    pub nutrition_plan: NutritionPlan,
}

/// Recompute the plan from the stored biometrics and persist it.
///
/// Recomputing with unchanged biometrics yields an identical plan.
async fn recompute_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<PlanResponse>> {
    if auth.uid != uid {
        return Err(AppError::Unauthorized);
    }

    let mut user = state
        .db
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    let biometrics = biometrics_from_user(&user)?;
    let plan = calculate_plan(&biometrics);

    user.nutrition_plan = Some(plan.clone());
    state.db.upsert_user(&user).await?;

    tracing::info!(uid = %uid, calories = plan.calories, "Nutrition plan updated");

    Ok(Json(PlanResponse {
        message: "Nutrition plan updated".to_string(),
        nutrition_plan: plan,
    }))
}

/// Fetch the stored plan.
async fn get_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(uid): Path<String>,
) -> Result<Json<NutritionPlan>> {
    if auth.uid != uid {
        return Err(AppError::Unauthorized);
    }

    let user = state
        .db
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

    let plan = user
        .nutrition_plan
        .ok_or_else(|| AppError::NotFound("No nutrition plan yet".to_string()))?;

    Ok(Json(plan))
}

/// Build calculator inputs from the user profile, rejecting incomplete
/// onboarding data with an itemized message.
fn biometrics_from_user(user: &crate::models::User) -> Result<Biometrics> {
    let mut missing = Vec::new();

    let weight_kg = user.weight_kg.unwrap_or_else(|| {
        missing.push("weight");
        0.0
    });
    let height_cm = user.height_cm.unwrap_or_else(|| {
        missing.push("height");
        0.0
    });
    let age = user.age.unwrap_or_else(|| {
        missing.push("age");
        0
    });
    let gender = user
        .gender
        .as_deref()
        .and_then(Gender::from_label)
        .unwrap_or_else(|| {
            missing.push("gender");
            Gender::Female
        });

    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Profile incomplete, missing: {}",
            missing.join(", ")
        )));
    }

    Ok(Biometrics {
        weight_kg,
        height_cm,
        age,
        gender,
        activity_level: user
            .activity_level
            .as_deref()
            .map(ActivityLevel::from_label)
            .unwrap_or(ActivityLevel::Unknown),
        goal: user
            .goal
            .as_deref()
            .map(Goal::from_label)
            .unwrap_or(Goal::Other),
    })
}
