// SPDX-License-Identifier: MIT

//! Nutrition plan calculation (Mifflin-St Jeor).
//!
//! Pure arithmetic: biometrics in, daily macro targets out. The result is
//! persisted on the user document and recomputed on demand, so the function
//! must be deterministic for identical inputs.

use serde::{Deserialize, Serialize};

/// Fiber recommendation is a fixed range regardless of biometrics.
const FIBER_MIN_G: u32 = 25;
const FIBER_MAX_G: u32 = 38;

/// Biological sex used in the BMR formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Self-reported activity level, mapped to a TDEE multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "Mostly Sitting")]
    MostlySitting,
    #[serde(rename = "Lightly Active")]
    LightlyActive,
    #[serde(rename = "Moderately Active")]
    ModeratelyActive,
    #[serde(rename = "Active Lifestyle")]
    ActiveLifestyle,
    #[serde(rename = "Highly Active")]
    HighlyActive,
    #[serde(other)]
    Unknown,
}

impl Gender {
    /// Parse the onboarding label ("male"/"female", case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

impl ActivityLevel {
    /// Parse the onboarding label; unrecognized labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Mostly Sitting" => Self::MostlySitting,
            "Lightly Active" => Self::LightlyActive,
            "Moderately Active" => Self::ModeratelyActive,
            "Active Lifestyle" => Self::ActiveLifestyle,
            "Highly Active" => Self::HighlyActive,
            _ => Self::Unknown,
        }
    }

    /// TDEE multiplier for this activity level.
    /// Unknown levels fall back to the lightly-active multiplier.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::MostlySitting => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::ActiveLifestyle => 1.725,
            ActivityLevel::HighlyActive => 1.9,
            ActivityLevel::Unknown => 1.375,
        }
    }
}

/// Weight goal, shifting daily calories by a fixed 500 kcal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "Losing Weight")]
    LosingWeight,
    #[serde(rename = "Gaining Weight")]
    GainingWeight,
    #[serde(rename = "Maintaining Weight")]
    MaintainingWeight,
    #[serde(other)]
    Other,
}

impl Goal {
    /// Parse the onboarding label; unrecognized labels keep TDEE unchanged.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Losing Weight" => Self::LosingWeight,
            "Gaining Weight" => Self::GainingWeight,
            "Maintaining Weight" => Self::MaintainingWeight,
            _ => Self::Other,
        }
    }
}

/// Inputs to the plan calculation, taken from the user profile.
#[derive(Debug, Clone)]
pub struct Biometrics {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

/// Daily fiber target range (fixed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberTarget {
    pub min: u32,
    pub max: u32,
    pub recommended: u32,
}

/// Computed daily macro targets, stored on the user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub calories: u32,
    pub protein_g: u32,
    pub fat_g: u32,
    pub carbs_g: u32,
    pub fiber: FiberTarget,
}

impl NutritionPlan {
    /// Zeroed plan shape returned when a user has not completed onboarding.
    pub fn zeroed() -> Self {
        Self {
            calories: 0,
            protein_g: 0,
            fat_g: 0,
            carbs_g: 0,
            fiber: FiberTarget {
                min: 0,
                max: 0,
                recommended: 0,
            },
        }
    }
}

/// Compute a nutrition plan from biometrics.
///
/// BMR via Mifflin-St Jeor, TDEE via activity multiplier, then a fixed
/// 500 kcal shift for weight loss/gain goals. Macro split: protein at
/// 1.5 g/kg, fat at 30% of calories, carbs at 50%.
pub fn calculate_plan(b: &Biometrics) -> NutritionPlan {
    let sex_term = match b.gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
    };
    let bmr = 10.0 * b.weight_kg + 6.25 * b.height_cm - 5.0 * f64::from(b.age) + sex_term;
    let tdee = bmr * b.activity_level.multiplier();

    let calories = match b.goal {
        Goal::LosingWeight => tdee - 500.0,
        Goal::GainingWeight => tdee + 500.0,
        _ => tdee,
    };

    let protein_g = (b.weight_kg * 1.5).round() as u32;
    let fat_g = (calories * 0.3 / 9.0).round() as u32;
    let carbs_g = (calories * 0.5 / 4.0).round() as u32;

    NutritionPlan {
        calories: calories.round() as u32,
        protein_g,
        fat_g,
        carbs_g,
        fiber: FiberTarget {
            min: FIBER_MIN_G,
            max: FIBER_MAX_G,
            recommended: (f64::from(FIBER_MIN_G + FIBER_MAX_G) / 2.0).round() as u32,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Biometrics {
        Biometrics {
            weight_kg: 80.0,
            height_cm: 180.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::LightlyActive,
            goal: Goal::LosingWeight,
        }
    }

    #[test]
    fn test_worked_example() {
        // BMR = 10*80 + 6.25*180 - 5*30 + 5 = 1780
        // TDEE = 1780 * 1.375 = 2447.5, calories = 1947.5 -> 1948
        let plan = calculate_plan(&sample());

        assert_eq!(plan.calories, 1948);
        assert_eq!(plan.protein_g, 120);
        assert_eq!(plan.fat_g, 65); // round(1947.5 * 0.3 / 9)
        assert_eq!(plan.carbs_g, 243); // round(1947.5 * 0.5 / 4)
        assert_eq!(
            plan.fiber,
            FiberTarget {
                min: 25,
                max: 38,
                recommended: 32
            }
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(calculate_plan(&sample()), calculate_plan(&sample()));
    }

    #[test]
    fn test_female_sex_term() {
        let mut b = sample();
        b.gender = Gender::Female;
        // BMR = 1780 - 166 = 1614, TDEE = 2219.25, calories = 1719.25
        let plan = calculate_plan(&b);
        assert_eq!(plan.calories, 1719);
    }

    #[test]
    fn test_gaining_weight_adds_surplus() {
        let mut b = sample();
        b.goal = Goal::GainingWeight;
        assert_eq!(calculate_plan(&b).calories, 2948);
    }

    #[test]
    fn test_maintenance_uses_tdee() {
        let mut b = sample();
        b.goal = Goal::MaintainingWeight;
        assert_eq!(calculate_plan(&b).calories, 2448);
    }

    #[test]
    fn test_unknown_activity_level_falls_back() {
        let mut b = sample();
        b.activity_level = ActivityLevel::Unknown;
        assert_eq!(
            calculate_plan(&b).calories,
            calculate_plan(&sample()).calories
        );
    }
}
