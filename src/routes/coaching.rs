// SPDX-License-Identifier: MIT

//! Coach relationship routes.
//!
//! Thin handlers over the transactional operations in the db layer; all
//! lifecycle guards live in `models::coaching` and are enforced inside the
//! Firestore transactions.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::coaching::RequestStatus;
use crate::models::{CoachRequest, NutritionistProfile};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coaching/request", post(create_request))
        .route("/coaching/accept", post(accept_request))
        .route("/coaching/select", post(select_coach))
        .route("/coaching/status", get(coaching_status))
        .route(
            "/coaching/request-status/{nutritionist_id}",
            get(request_status),
        )
        .route("/coaching/end-relationship", post(end_relationship))
        .route("/coaching/block", post(block_coach))
        .route("/coaching/unblock", post(unblock_coach))
        .route("/coaching/rate", post(rate_coach))
        .route("/coaching/blocked", get(list_blocked))
        .route("/coaching/nutritionists", get(list_nutritionists))
}

// ─── Request Lifecycle ───────────────────────────────────────

#[derive(Deserialize)]
struct CreateRequestBody {
    nutritionist_id: String,
}

#[derive(Serialize)]
pub struct CreateRequestResponse {
    pub message: String,
    pub request_id: String,
}

/// Send a coaching request to a nutritionist.
async fn create_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(axum::http::StatusCode, Json<CreateRequestResponse>)> {
    if state.db.get_nutritionist(&body.nutritionist_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Nutritionist {} not found",
            body.nutritionist_id
        )));
    }

    state
        .db
        .create_coach_request_atomic(&user.uid, &body.nutritionist_id, &now_rfc3339())
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateRequestResponse {
            message: "Request sent".to_string(),
            request_id: CoachRequest::doc_id(&user.uid, &body.nutritionist_id),
        }),
    ))
}

#[derive(Deserialize)]
struct AcceptRequestBody {
    user_uid: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Accept a pending request. The caller must be the target nutritionist.
async fn accept_request(
    State(state): State<Arc<AppState>>,
    Extension(coach): Extension<AuthUser>,
    Json(body): Json<AcceptRequestBody>,
) -> Result<Json<MessageResponse>> {
    if state.db.get_nutritionist(&coach.uid).await?.is_none() {
        return Err(AppError::Unauthorized);
    }

    state
        .db
        .accept_coach_request_atomic(&body.user_uid, &coach.uid)
        .await?;

    Ok(Json(MessageResponse {
        message: "Request accepted".to_string(),
    }))
}

#[derive(Deserialize)]
struct SelectCoachBody {
    nutritionist_id: String,
}

/// Select an accepted coach as the active coach.
async fn select_coach(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SelectCoachBody>,
) -> Result<Json<MessageResponse>> {
    state
        .db
        .select_coach_atomic(&user.uid, &body.nutritionist_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Coach selected".to_string(),
    }))
}

/// End the active coaching relationship. Idempotent: succeeds even when
/// there is no active coach.
async fn end_relationship(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    let ended = state
        .db
        .end_relationship_atomic(&user.uid, RequestStatus::EndedByUser, &now_rfc3339())
        .await?;

    let message = match ended {
        Some(_) => "Relationship ended".to_string(),
        None => "No active coach".to_string(),
    };

    Ok(Json(MessageResponse { message }))
}

#[derive(Deserialize)]
struct BlockBody {
    nutritionist_id: String,
}

/// Block a coach; if it is the active coach, the relationship ends in the
/// same transaction.
async fn block_coach(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BlockBody>,
) -> Result<Json<MessageResponse>> {
    state
        .db
        .block_coach_atomic(&user.uid, &body.nutritionist_id, &now_rfc3339())
        .await?;

    Ok(Json(MessageResponse {
        message: "Coach blocked".to_string(),
    }))
}

/// Remove a block marker. Does not resurrect any prior request.
async fn unblock_coach(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BlockBody>,
) -> Result<Json<MessageResponse>> {
    state
        .db
        .unblock_coach(&user.uid, &body.nutritionist_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Coach unblocked".to_string(),
    }))
}

#[derive(Deserialize)]
struct RateBody {
    nutritionist_id: String,
    rating: u32,
}

#[derive(Serialize)]
pub struct RateResponse {
    pub message: String,
    pub average_rating: f64,
}

/// Rate a nutritionist with an integer score 1..=5.
async fn rate_coach(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RateBody>,
) -> Result<Json<RateResponse>> {
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest(
            "rating must be an integer between 1 and 5".to_string(),
        ));
    }

    let average = state
        .db
        .rate_nutritionist_atomic(&user.uid, &body.nutritionist_id, body.rating, &now_rfc3339())
        .await?;

    Ok(Json(RateResponse {
        message: "Rating recorded".to_string(),
        average_rating: average,
    }))
}

// ─── Status Queries ──────────────────────────────────────────

#[derive(Serialize)]
pub struct RequestStatusResponse {
    pub status: String,
}

/// Status of the caller's request slot for one nutritionist.
///
/// Returns the slot status if non-terminal, otherwise the synthetic status
/// `none`. This is the query the client polls before enabling the
/// "send request" action.
async fn request_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(nutritionist_id): Path<String>,
) -> Result<Json<RequestStatusResponse>> {
    let status = state
        .db
        .get_coach_request(&user.uid, &nutritionist_id)
        .await?
        .map(|r| r.status)
        .filter(|s| s.is_non_terminal())
        .map_or("none", RequestStatus::as_str);

    Ok(Json(RequestStatusResponse {
        status: status.to_string(),
    }))
}

/// A request hydrated with the nutritionist's public profile.
#[derive(Serialize)]
pub struct HydratedRequest {
    pub request_id: String,
    pub status: String,
    pub requested_at: String,
    pub nutritionist: NutritionistProfile,
}

#[derive(Serialize)]
pub struct CoachingStatusResponse {
    pub active_coach_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_coach_details: Option<NutritionistProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_requests: Option<Vec<HydratedRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_requests: Option<Vec<HydratedRequest>>,
}

/// Aggregate coaching status for the caller.
///
/// With an active coach: the coach's id and public profile. A dangling
/// `active_coach_id` whose profile no longer exists is reported as no
/// active coach (logged) rather than failing the query.
///
/// Without one: the caller's pending and accepted requests, hydrated with
/// profiles; items whose profile lookup fails are dropped, not surfaced.
async fn coaching_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CoachingStatusResponse>> {
    let profile = state
        .db
        .get_user(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.uid)))?;

    if let Some(coach_id) = &profile.active_coach_id {
        match state.db.get_nutritionist(coach_id).await? {
            Some(n) => {
                return Ok(Json(CoachingStatusResponse {
                    active_coach_id: Some(coach_id.clone()),
                    active_coach_details: Some(n.into()),
                    pending_requests: None,
                    accepted_requests: None,
                }));
            }
            None => {
                tracing::warn!(
                    uid = %user.uid,
                    coach_id = %coach_id,
                    "Active coach profile missing; reporting no active coach"
                );
            }
        }
    }

    let requests: Vec<_> = state
        .db
        .get_coach_requests_for_user(&user.uid)
        .await?
        .into_iter()
        .filter(|r| matches!(r.status, RequestStatus::Pending | RequestStatus::Accepted))
        .collect();

    let ids: Vec<String> = requests.iter().map(|r| r.nutritionist_id.clone()).collect();
    let profiles = state.db.get_nutritionists_by_ids(&ids).await?;

    let mut pending = Vec::new();
    let mut accepted = Vec::new();

    for (request, profile) in requests.into_iter().zip(profiles) {
        let Some(n) = profile else {
            tracing::warn!(
                nutritionist_id = %request.nutritionist_id,
                "Dropping request with missing nutritionist profile"
            );
            continue;
        };

        let bucket = match request.status {
            RequestStatus::Pending => &mut pending,
            _ => &mut accepted,
        };
        bucket.push(HydratedRequest {
            request_id: CoachRequest::doc_id(&request.user_uid, &request.nutritionist_id),
            status: request.status.as_str().to_string(),
            requested_at: request.requested_at,
            nutritionist: n.into(),
        });
    }

    Ok(Json(CoachingStatusResponse {
        active_coach_id: None,
        active_coach_details: None,
        pending_requests: Some(pending),
        accepted_requests: Some(accepted),
    }))
}

/// List the caller's blocked coaches.
async fn list_blocked(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<crate::models::BlockedCoach>>> {
    let blocked = state.db.get_blocked_coaches(&user.uid).await?;
    Ok(Json(blocked))
}

/// List nutritionist public profiles for the browse screen.
async fn list_nutritionists(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NutritionistProfile>>> {
    let nutritionists = state.db.list_nutritionists().await?;
    Ok(Json(
        nutritionists.into_iter().map(Into::into).collect(),
    ))
}
