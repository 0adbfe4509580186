// SPDX-License-Identifier: MIT

//! BiteWise API Server
//!
//! Backend for the BiteWise nutrition-tracking app: nutrition plans, meal
//! logging, coach matching, and a recipe-search proxy, backed by Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::RecipeClient;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub recipe_client: RecipeClient,
}
