// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod account;
pub mod coaching;
pub mod consumption;
pub mod plan;

pub use account::{Account, Nutritionist, NutritionistProfile, User};
pub use coaching::{BlockedCoach, CoachRequest, Rating, RequestStatus};
pub use consumption::{DailyConsumption, LoggedMeal, MealType, NutrientTotals};
pub use plan::NutritionPlan;

use serde::{Deserialize, Serialize};

/// One weight-history entry per user and date.
///
/// Stored at `weight_history/{uid}_{date}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    pub uid: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub weight_kg: f64,
    /// When the entry was written (ISO 8601)
    pub logged_at: String,
}

impl WeightEntry {
    pub fn doc_id(uid: &str, date: &str) -> String {
        format!("{}_{}", uid, date)
    }
}
