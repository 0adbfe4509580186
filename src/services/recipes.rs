// SPDX-License-Identifier: MIT

//! Spoonacular API client for recipe search and details.
//!
//! Stateless query translation: no caching, no retries. Quota exhaustion
//! (402/429) is logged and surfaced as an upstream error.

use crate::error::AppError;
use serde::Deserialize;
use serde_json::Value;

/// Spoonacular API client.
#[derive(Clone)]
pub struct RecipeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Recipe search parameters, forwarded from the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeSearch {
    pub query: Option<String>,
    /// Diet filter (e.g. "vegetarian")
    pub diet: Option<String>,
    /// Comma-separated intolerances
    pub intolerances: Option<String>,
    /// Maximum results to return
    pub number: Option<u32>,
}

impl RecipeClient {
    /// Create a new client with an API key.
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.spoonacular.com".to_string(),
            api_key,
        }
    }

    /// Override the base URL (tests).
    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Search recipes via `complexSearch`.
    pub async fn search(&self, params: &RecipeSearch) -> Result<Value, AppError> {
        let url = format!("{}/recipes/complexSearch", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("apiKey", self.api_key.clone()),
            ("addRecipeNutrition", "true".to_string()),
            (
                "number",
                params.number.unwrap_or(10).min(100).to_string(),
            ),
        ];
        if let Some(q) = &params.query {
            query.push(("query", q.clone()));
        }
        if let Some(diet) = &params.diet {
            query.push(("diet", diet.clone()));
        }
        if let Some(intolerances) = &params.intolerances {
            query.push(("intolerances", intolerances.clone()));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::RecipeApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Get full recipe details with nutrition.
    pub async fn details(&self, recipe_id: u64) -> Result<Value, AppError> {
        let url = format!("{}/recipes/{}/information", self.base_url, recipe_id);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("includeNutrition", "true"),
            ])
            .send()
            .await
            .map_err(|e| AppError::RecipeApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // 402 = daily quota spent, 429 = rate limited
            if status.as_u16() == 402 || status.as_u16() == 429 {
                tracing::warn!(status = status.as_u16(), "Spoonacular quota exhausted");
            }

            return Err(AppError::RecipeApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::RecipeApi(format!("JSON parse error: {}", e)))
    }
}
