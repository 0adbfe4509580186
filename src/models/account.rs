// SPDX-License-Identifier: MIT

//! Account models: end users and nutritionists.
//!
//! The two account kinds live in separate collections but are resolved once
//! at auth time into a single tagged [`Account`], so handlers never repeat
//! the two-collection lookup.

use serde::{Deserialize, Serialize};

use crate::models::plan::NutritionPlan;

/// End-user profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Auth UID (also used as document ID)
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Current weight in kilograms
    pub weight_kg: Option<f64>,
    /// Height in centimeters
    pub height_cm: Option<f64>,
    pub age: Option<u32>,
    /// "male" or "female", as collected during onboarding
    pub gender: Option<String>,
    /// Weight goal (e.g. "Losing Weight")
    pub goal: Option<String>,
    /// Activity level (e.g. "Lightly Active")
    pub activity_level: Option<String>,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    /// Computed macro targets, set after onboarding
    pub nutrition_plan: Option<NutritionPlan>,
    /// UID of the currently selected coach, if any.
    /// Only ever written inside coaching transactions.
    pub active_coach_id: Option<String>,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}

/// Nutritionist profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nutritionist {
    /// Auth UID (also used as document ID)
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub workplace: String,
    pub years_of_experience: u32,
    pub short_bio: String,
    pub profile_image_url: Option<String>,
    /// Running mean of all ratings, one decimal place
    #[serde(default)]
    pub average_rating: f64,
    /// Number of distinct raters
    #[serde(default)]
    pub rating_count: u32,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}

/// Public subset of a nutritionist profile, used when hydrating
/// coaching-status responses and the browse list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionistProfile {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub workplace: String,
    pub years_of_experience: u32,
    pub short_bio: String,
    pub profile_image_url: Option<String>,
    pub average_rating: f64,
    pub rating_count: u32,
}

impl From<Nutritionist> for NutritionistProfile {
    fn from(n: Nutritionist) -> Self {
        Self {
            uid: n.uid,
            first_name: n.first_name,
            last_name: n.last_name,
            specialization: n.specialization,
            workplace: n.workplace,
            years_of_experience: n.years_of_experience,
            short_bio: n.short_bio,
            profile_image_url: n.profile_image_url,
            average_rating: n.average_rating,
            rating_count: n.rating_count,
        }
    }
}

/// An authenticated account, tagged by role.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Account {
    User(User),
    Nutritionist(Nutritionist),
}

impl Account {
    pub fn uid(&self) -> &str {
        match self {
            Account::User(u) => &u.uid,
            Account::Nutritionist(n) => &n.uid,
        }
    }
}
