// SPDX-License-Identifier: MIT

//! Profile routes: own account and weight tracking.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Account, WeightEntry};
use crate::routes::auth::resolve_account;
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile/me", get(get_me))
        .route("/profile/weight", post(log_weight))
        .route("/profile/weight-history", get(weight_history))
}

/// Get the authenticated account.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Account>> {
    let account = resolve_account(&state, &auth.uid).await?;
    Ok(Json(account))
}

#[derive(Deserialize)]
struct LogWeightBody {
    /// Calendar date, `YYYY-MM-DD`; defaults to today
    date: Option<String>,
    weight_kg: f64,
}

#[derive(Serialize)]
pub struct LogWeightResponse {
    pub message: String,
    pub entry: WeightEntry,
}

/// Record a weight entry (one per date, overwritten on re-log) and update
/// the profile weight so later plan recomputes use it.
async fn log_weight(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<LogWeightBody>,
) -> Result<Json<LogWeightResponse>> {
    if !body.weight_kg.is_finite() || body.weight_kg <= 0.0 {
        return Err(AppError::BadRequest(
            "weight_kg must be a positive number".to_string(),
        ));
    }

    let date = match body.date {
        Some(raw) => {
            if NaiveDate::parse_from_str(&raw, "%Y-%m-%d").is_err() {
                return Err(AppError::BadRequest(
                    "date must be a valid YYYY-MM-DD date".to_string(),
                ));
            }
            raw
        }
        None => Utc::now().format("%Y-%m-%d").to_string(),
    };

    let entry = WeightEntry {
        uid: auth.uid.clone(),
        date,
        weight_kg: body.weight_kg,
        logged_at: now_rfc3339(),
    };
    state.db.log_weight_atomic(&entry).await?;

    Ok(Json(LogWeightResponse {
        message: "Weight logged".to_string(),
        entry,
    }))
}

/// Weight history, most recent first.
async fn weight_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<WeightEntry>>> {
    let entries = state.db.get_weight_history(&auth.uid).await?;
    Ok(Json(entries))
}
