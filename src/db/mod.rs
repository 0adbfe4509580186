//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const NUTRITIONISTS: &str = "nutritionists";
    /// Request slots keyed by `{user_uid}_{nutritionist_uid}`
    pub const COACH_REQUESTS: &str = "coach_requests";
    /// Ratings keyed by `{nutritionist_uid}_{rater_uid}`
    pub const RATINGS: &str = "ratings";
    /// Block markers keyed by `{user_uid}_{nutritionist_uid}`
    pub const BLOCKED_COACHES: &str = "blocked_coaches";
    /// Daily consumption keyed by `{uid}_{YYYY-MM-DD}`
    pub const DAILY_CONSUMPTION: &str = "daily_consumption";
    /// Weight entries keyed by `{uid}_{YYYY-MM-DD}`
    pub const WEIGHT_HISTORY: &str = "weight_history";
}
