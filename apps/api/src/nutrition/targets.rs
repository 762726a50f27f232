//! Daily target calculator: profile → BMR → TDEE → goal-adjusted calories → macro grams.
//!
//! Pure and deterministic. An incomplete profile is an expected state (forms are
//! filled in gradually), so it yields `TargetsUnavailable` listing the missing
//! fields rather than an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::profile::{DietGoal, Sex, UserProfile};

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

const AGE_RANGE: (f64, f64) = (1.0, 120.0);
const WEIGHT_RANGE_KG: (f64, f64) = (20.0, 400.0);
const HEIGHT_RANGE_CM: (f64, f64) = (50.0, 272.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTargets {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl DailyTargets {
    /// kcal implied by the macro grams (4/4/9).
    pub fn macro_calories(&self) -> f64 {
        self.protein_g * KCAL_PER_G_PROTEIN + self.carbs_g * KCAL_PER_G_CARBS + self.fat_g * KCAL_PER_G_FAT
    }

    /// Name of the first negative or non-finite field, if any.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        [
            ("calories", self.calories),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
        .map(|(name, _)| name)
    }
}

/// Share of calories per macro, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

impl MacroSplit {
    pub fn for_goal(goal: DietGoal) -> Self {
        let (protein_pct, carbs_pct, fat_pct) = match goal {
            DietGoal::MuscleGain => (30.0, 50.0, 20.0),
            DietGoal::Recomposition => (40.0, 35.0, 25.0),
            DietGoal::FatLoss | DietGoal::Maintenance | DietGoal::Other => (30.0, 40.0, 30.0),
        };
        Self {
            protein_pct,
            carbs_pct,
            fat_pct,
        }
    }
}

/// Intermediate values behind a `DailyTargets`, surfaced so the UI can show its working.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetBreakdown {
    pub bmr: f64,
    pub activity_factor: f64,
    pub tdee: f64,
    pub goal_adjustment: f64,
    pub split: MacroSplit,
    pub targets: DailyTargets,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("targets unavailable, missing or implausible: {}", .missing_fields.join(", "))]
pub struct TargetsUnavailable {
    pub missing_fields: Vec<&'static str>,
}

/// Mifflin-St Jeor. Sex outside male/female uses the mean of both equations.
pub fn mifflin_st_jeor_bmr(sex: Sex, weight_kg: f64, height_cm: f64, age: f64) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age;
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
        Sex::Other => ((base + 5.0) + (base - 161.0)) / 2.0,
    }
}

pub fn goal_adjustment(goal: DietGoal) -> f64 {
    match goal {
        DietGoal::FatLoss => -500.0,
        DietGoal::MuscleGain => 300.0,
        DietGoal::Recomposition => -200.0,
        DietGoal::Maintenance | DietGoal::Other => 0.0,
    }
}

/// Converts a calorie budget into macro grams, rounded to whole grams.
pub fn macro_grams(calories: f64, split: MacroSplit) -> DailyTargets {
    DailyTargets {
        calories,
        protein_g: (calories * split.protein_pct / 100.0 / KCAL_PER_G_PROTEIN).round(),
        carbs_g: (calories * split.carbs_pct / 100.0 / KCAL_PER_G_CARBS).round(),
        fat_g: (calories * split.fat_pct / 100.0 / KCAL_PER_G_FAT).round(),
    }
}

pub fn calculate_daily_targets(profile: &UserProfile) -> Result<DailyTargets, TargetsUnavailable> {
    calculate_breakdown(profile).map(|b| b.targets)
}

pub fn calculate_breakdown(profile: &UserProfile) -> Result<TargetBreakdown, TargetsUnavailable> {
    let mut missing = Vec::new();

    let age = plausible(profile.age, AGE_RANGE, "age", &mut missing);
    let weight = plausible(
        profile.current_weight_kg,
        WEIGHT_RANGE_KG,
        "current_weight_kg",
        &mut missing,
    );
    let height = plausible(profile.height_cm, HEIGHT_RANGE_CM, "height_cm", &mut missing);
    if profile.sex.is_none() {
        missing.push("sex");
    }
    if profile.activity_level.is_none() {
        missing.push("activity_level");
    }
    if profile.primary_goal.is_none() {
        missing.push("primary_goal");
    }

    let (Some(age), Some(weight), Some(height), Some(sex), Some(activity), Some(goal)) = (
        age,
        weight,
        height,
        profile.sex,
        profile.activity_level,
        profile.primary_goal,
    ) else {
        return Err(TargetsUnavailable {
            missing_fields: missing,
        });
    };

    let bmr = mifflin_st_jeor_bmr(sex, weight, height, age);
    let activity_factor = activity.factor();
    let tdee = (bmr * activity_factor).round();
    let adjustment = goal_adjustment(goal);
    // Negative only for in-range but physically implausible combinations.
    let calories = (tdee + adjustment).max(0.0).round();
    let split = MacroSplit::for_goal(goal);

    Ok(TargetBreakdown {
        bmr,
        activity_factor,
        tdee,
        goal_adjustment: adjustment,
        split,
        targets: macro_grams(calories, split),
    })
}

fn plausible(
    value: Option<f64>,
    (min, max): (f64, f64),
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() && (min..=max).contains(&v) => Some(v),
        _ => {
            missing.push(field);
            None
        }
    }
}
