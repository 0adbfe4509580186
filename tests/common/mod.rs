// SPDX-License-Identifier: MIT

use bitewise_api::config::Config;
use bitewise_api::db::FirestoreDb;
use bitewise_api::routes::create_router;
use bitewise_api::services::RecipeClient;
use bitewise_api::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let recipe_client = RecipeClient::new(config.spoonacular_api_key.clone());

    let state = Arc::new(AppState {
        config,
        db,
        recipe_client,
    });

    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db().await;
    let recipe_client = RecipeClient::new(config.spoonacular_api_key.clone());

    let state = Arc::new(AppState {
        config,
        db,
        recipe_client,
    });

    (create_router(state.clone()), state)
}

/// Unique per-run ID so reruns against a persistent emulator don't collide.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Create a test JWT token for a UID.
#[allow(dead_code)]
pub fn create_test_jwt(uid: &str, signing_key: &[u8]) -> String {
    bitewise_api::middleware::auth::create_jwt(uid, signing_key).expect("JWT creation failed")
}
