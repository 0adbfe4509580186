// SPDX-License-Identifier: MIT

//! Authentication routes: login and account registration.

use axum::{
    extract::{Request, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, extract_token, verify_token};
use crate::models::{Account, Nutritionist, User};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register_user))
        .route("/auth/register-nutritionist", post(register_nutritionist))
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub account: Account,
}

/// Verify the bearer token and resolve the account.
///
/// The UID is looked up in the users collection first, then nutritionists;
/// the result is a single tagged account so downstream consumers never
/// repeat the two-collection lookup.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
) -> Result<Json<LoginResponse>> {
    let token = extract_token(&jar, &request).ok_or(AppError::Unauthorized)?;
    let claims = verify_token(&token, &state.config.jwt_signing_key)?;

    let account = resolve_account(&state, &claims.sub).await?;

    tracing::info!(uid = %claims.sub, "Login");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        account,
    }))
}

/// Resolve a UID across the two account collections.
pub async fn resolve_account(state: &AppState, uid: &str) -> Result<Account> {
    if let Some(user) = state.db.get_user(uid).await? {
        return Ok(Account::User(user));
    }
    if let Some(nutritionist) = state.db.get_nutritionist(uid).await? {
        return Ok(Account::Nutritionist(nutritionist));
    }
    Err(AppError::NotFound(format!("Account {} not found", uid)))
}

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub token: String,
}

/// Create an end-user account and issue a session token.
async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<Json<RegisterResponse>> {
    if body.uid.is_empty() || body.email.is_empty() {
        return Err(AppError::BadRequest("uid and email are required".to_string()));
    }

    if state.db.get_user(&body.uid).await?.is_some()
        || state.db.get_nutritionist(&body.uid).await?.is_some()
    {
        return Err(AppError::Conflict("Account already exists".to_string()));
    }

    let user = User {
        uid: body.uid.clone(),
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        weight_kg: None,
        height_cm: None,
        age: None,
        gender: None,
        goal: None,
        activity_level: None,
        dietary_preferences: Vec::new(),
        nutrition_plan: None,
        active_coach_id: None,
        created_at: now_rfc3339(),
    };
    state.db.upsert_user(&user).await?;

    let token = create_jwt(&user.uid, &state.config.jwt_signing_key)?;

    tracing::info!(uid = %user.uid, "User registered");

    Ok(Json(RegisterResponse {
        message: "Registration successful".to_string(),
        token,
    }))
}

#[derive(Deserialize)]
pub struct RegisterNutritionistRequest {
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub workplace: String,
    pub years_of_experience: u32,
    pub short_bio: String,
    pub profile_image_url: Option<String>,
}

/// Create a nutritionist account and issue a session token.
async fn register_nutritionist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterNutritionistRequest>,
) -> Result<Json<RegisterResponse>> {
    if body.uid.is_empty() || body.email.is_empty() {
        return Err(AppError::BadRequest("uid and email are required".to_string()));
    }

    if state.db.get_user(&body.uid).await?.is_some()
        || state.db.get_nutritionist(&body.uid).await?.is_some()
    {
        return Err(AppError::Conflict("Account already exists".to_string()));
    }

    let nutritionist = Nutritionist {
        uid: body.uid.clone(),
        email: body.email,
        first_name: body.first_name,
        last_name: body.last_name,
        specialization: body.specialization,
        workplace: body.workplace,
        years_of_experience: body.years_of_experience,
        short_bio: body.short_bio,
        profile_image_url: body.profile_image_url,
        average_rating: 0.0,
        rating_count: 0,
        created_at: now_rfc3339(),
    };
    state.db.upsert_nutritionist(&nutritionist).await?;

    let token = create_jwt(&nutritionist.uid, &state.config.jwt_signing_key)?;

    tracing::info!(uid = %nutritionist.uid, "Nutritionist registered");

    Ok(Json(RegisterResponse {
        message: "Registration successful".to_string(),
        token,
    }))
}
