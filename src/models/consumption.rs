// SPDX-License-Identifier: MIT

//! Daily consumption records and meal-log validation.
//!
//! A `DailyConsumption` document holds the running nutrient totals for one
//! user and calendar date plus the logged meals grouped by meal type. Totals
//! and meal arrays are only mutated together, inside a Firestore transaction,
//! so concurrent logs for the same day cannot lose updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Meal slot a logged meal belongs to. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "snack" => Some(Self::Snack),
            _ => None,
        }
    }
}

/// Running nutrient totals for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
}

impl NutrientTotals {
    /// Add a meal's nutrients to the running totals.
    pub fn add(&mut self, meal: &LoggedMeal) {
        self.calories += meal.calories;
        self.protein += meal.protein;
        self.carbs += meal.carbs;
        self.fat += meal.fat;
        self.fiber += meal.fiber;
    }
}

/// A single logged meal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedMeal {
    /// When the meal was logged (ISO 8601)
    pub logged_at: String,
    /// Where the entry came from: "manual" or "recipe"
    pub source: String,
    /// Spoonacular recipe ID when logged from a recipe
    pub recipe_id: Option<u64>,
    pub title: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub image_url: Option<String>,
}

/// Per-user, per-date consumption document.
///
/// Stored at `daily_consumption/{uid}_{date}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConsumption {
    pub uid: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub totals: NutrientTotals,
    #[serde(default)]
    pub breakfast: Vec<LoggedMeal>,
    #[serde(default)]
    pub lunch: Vec<LoggedMeal>,
    #[serde(default)]
    pub dinner: Vec<LoggedMeal>,
    #[serde(default)]
    pub snack: Vec<LoggedMeal>,
}

impl DailyConsumption {
    /// Empty document for a day with no logs yet.
    pub fn empty(uid: &str, date: &str) -> Self {
        Self {
            uid: uid.to_string(),
            date: date.to_string(),
            totals: NutrientTotals::default(),
            breakfast: Vec::new(),
            lunch: Vec::new(),
            dinner: Vec::new(),
            snack: Vec::new(),
        }
    }

    /// Append a meal to its slot and add it to the running totals.
    pub fn log_meal(&mut self, meal_type: MealType, meal: LoggedMeal) {
        self.totals.add(&meal);
        match meal_type {
            MealType::Breakfast => self.breakfast.push(meal),
            MealType::Lunch => self.lunch.push(meal),
            MealType::Dinner => self.dinner.push(meal),
            MealType::Snack => self.snack.push(meal),
        }
    }
}

/// Raw meal-log input before validation. All fields optional so that every
/// violation can be reported at once rather than failing on the first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealDraft {
    pub meal_type: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    pub date: Option<String>,
    pub title: Option<String>,
    pub source: Option<String>,
    pub recipe_id: Option<u64>,
    pub image_url: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
}

impl MealDraft {
    /// Validate the draft, collecting every violated field.
    ///
    /// Missing nutrient values are rejected, never defaulted to zero.
    pub fn validate(&self, logged_at: &str) -> Result<(MealType, String, LoggedMeal), Vec<String>> {
        let mut details = Vec::new();

        let meal_type = match self.meal_type.as_deref() {
            None | Some("") => {
                details.push("meal_type is required".to_string());
                None
            }
            Some(raw) => match MealType::parse(raw) {
                Some(mt) => Some(mt),
                None => {
                    details.push(
                        "meal_type must be one of breakfast, lunch, dinner, snack".to_string(),
                    );
                    None
                }
            },
        };

        let date = match self.date.as_deref() {
            None | Some("") => {
                details.push("date is required".to_string());
                None
            }
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(_) => Some(raw.to_string()),
                Err(_) => {
                    details.push("date must be a valid YYYY-MM-DD date".to_string());
                    None
                }
            },
        };

        let title = match self.title.as_deref() {
            None | Some("") => {
                details.push("title is required".to_string());
                None
            }
            Some(t) => Some(t.to_string()),
        };

        let mut nutrient = |name: &str, value: Option<f64>| match value {
            None => {
                details.push(format!("{} is required", name));
                0.0
            }
            Some(v) if !v.is_finite() || v < 0.0 => {
                details.push(format!("{} must be a non-negative number", name));
                0.0
            }
            Some(v) => v,
        };

        let calories = nutrient("calories", self.calories);
        let protein = nutrient("protein", self.protein);
        let carbs = nutrient("carbs", self.carbs);
        let fat = nutrient("fat", self.fat);
        let fiber = nutrient("fiber", self.fiber);

        let (Some(meal_type), Some(date), Some(title)) = (meal_type, date, title) else {
            return Err(details);
        };
        if !details.is_empty() {
            return Err(details);
        }

        let meal = LoggedMeal {
            logged_at: logged_at.to_string(),
            source: self
                .source
                .clone()
                .unwrap_or_else(|| "manual".to_string()),
            recipe_id: self.recipe_id,
            title,
            calories,
            protein,
            carbs,
            fat,
            fiber,
            image_url: self.image_url.clone(),
        };

        Ok((meal_type, date, meal))
    }
}

/// Coarse logging streak signal: 0 = nothing today, 1 = logged today only,
/// 2 = logged today and yesterday. Deliberately not a consecutive-day count.
pub fn streak_signal(logged_today: bool, logged_yesterday: bool) -> u8 {
    match (logged_today, logged_yesterday) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MealDraft {
        MealDraft {
            meal_type: Some("Breakfast".to_string()),
            date: Some("2026-08-26".to_string()),
            title: Some("Oatmeal".to_string()),
            source: None,
            recipe_id: None,
            image_url: None,
            calories: Some(350.0),
            protein: Some(12.0),
            carbs: Some(60.0),
            fat: Some(7.0),
            fiber: Some(8.0),
        }
    }

    #[test]
    fn test_valid_draft_case_insensitive_meal_type() {
        let (meal_type, date, meal) = draft().validate("2026-08-26T08:00:00Z").unwrap();
        assert_eq!(meal_type, MealType::Breakfast);
        assert_eq!(date, "2026-08-26");
        assert_eq!(meal.title, "Oatmeal");
        assert_eq!(meal.source, "manual");
    }

    #[test]
    fn test_missing_nutrients_itemized() {
        let mut d = draft();
        d.calories = None;
        d.fiber = None;

        let details = d.validate("now").unwrap_err();
        assert_eq!(details.len(), 2);
        assert!(details.iter().any(|m| m.contains("calories")));
        assert!(details.iter().any(|m| m.contains("fiber")));
    }

    #[test]
    fn test_invalid_meal_type_and_date() {
        let mut d = draft();
        d.meal_type = Some("brunch".to_string());
        d.date = Some("2026-13-99".to_string());

        let details = d.validate("now").unwrap_err();
        assert!(details.iter().any(|m| m.contains("meal_type")));
        assert!(details.iter().any(|m| m.contains("date")));
    }

    #[test]
    fn test_negative_nutrient_rejected() {
        let mut d = draft();
        d.fat = Some(-1.0);
        let details = d.validate("now").unwrap_err();
        assert_eq!(details, vec!["fat must be a non-negative number"]);
    }

    #[test]
    fn test_log_meal_updates_totals_and_slot() {
        let mut day = DailyConsumption::empty("u1", "2026-08-26");
        let (mt, _, meal) = draft().validate("now").unwrap();
        day.log_meal(mt, meal.clone());
        day.log_meal(MealType::Snack, meal);

        assert_eq!(day.breakfast.len(), 1);
        assert_eq!(day.snack.len(), 1);
        assert_eq!(day.totals.calories, 700.0);
        assert_eq!(day.totals.fiber, 16.0);
    }

    #[test]
    fn test_streak_signal() {
        assert_eq!(streak_signal(false, true), 0);
        assert_eq!(streak_signal(true, false), 1);
        assert_eq!(streak_signal(true, true), 2);
    }
}
