// SPDX-License-Identifier: MIT

//! Recipe proxy routes (Spoonacular).

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::services::RecipeSearch;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recipes/fetch-recipes", post(fetch_recipes))
        .route("/recipes/details/{recipe_id}", get(recipe_details))
}

/// Search recipes. The upstream response is passed through unchanged.
async fn fetch_recipes(
    State(state): State<Arc<AppState>>,
    Json(params): Json<RecipeSearch>,
) -> Result<Json<Value>> {
    let results = state.recipe_client.search(&params).await?;
    Ok(Json(results))
}

/// Full recipe details with nutrition.
async fn recipe_details(
    State(state): State<Arc<AppState>>,
    Path(recipe_id): Path<u64>,
) -> Result<Json<Value>> {
    let details = state.recipe_client.details(recipe_id).await?;
    Ok(Json(details))
}
