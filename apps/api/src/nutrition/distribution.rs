//! Meal distribution: splits daily targets into per-slot targets.
//!
//! Each row carries an independent percentage per macro. Custom rows are used as
//! supplied; they are not normalised to 100 (a warning is logged when the calorie
//! column drifts), but negative or non-finite percentages are rejected.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::models::plan::MacroTotals;
use crate::nutrition::targets::DailyTargets;

const PCT_SUM_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDistribution {
    #[serde(alias = "meal_name")]
    pub meal_name: String,
    #[serde(rename = "calories_pct", alias = "caloriesPct")]
    pub calories_pct: f64,
    #[serde(rename = "protein_pct", alias = "proteinPct")]
    pub protein_pct: f64,
    #[serde(rename = "carbs_pct", alias = "carbsPct")]
    pub carbs_pct: f64,
    #[serde(rename = "fat_pct", alias = "fatPct")]
    pub fat_pct: f64,
}

impl MealDistribution {
    fn uniform(meal_name: &str, pct: f64) -> Self {
        Self {
            meal_name: meal_name.to_string(),
            calories_pct: pct,
            protein_pct: pct,
            carbs_pct: pct,
            fat_pct: pct,
        }
    }
}

/// Macro targets for one meal slot, rounded to whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealTarget {
    pub meal_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MealTarget {
    pub fn macros(&self) -> MacroTotals {
        MacroTotals {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

/// Six-slot default: 25/10/30/10/20/5 for every macro.
pub fn default_distribution() -> Vec<MealDistribution> {
    [
        ("Breakfast", 25.0),
        ("Morning Snack", 10.0),
        ("Lunch", 30.0),
        ("Afternoon Snack", 10.0),
        ("Dinner", 20.0),
        ("Evening Snack", 5.0),
    ]
    .into_iter()
    .map(|(name, pct)| MealDistribution::uniform(name, pct))
    .collect()
}

/// Splits `daily` across meal slots. `None` or an empty slice selects the default table.
pub fn allocate_meal_targets(
    daily: &DailyTargets,
    distributions: Option<&[MealDistribution]>,
) -> Result<Vec<MealTarget>, AppError> {
    if let Some(field) = daily.first_invalid_field() {
        return Err(AppError::invalid_field(
            format!("daily_targets.{field}"),
            "must be a finite non-negative number",
        ));
    }

    let default_rows;
    let rows = match distributions {
        Some(rows) if !rows.is_empty() => {
            validate_rows(rows)?;
            rows
        }
        _ => {
            default_rows = default_distribution();
            &default_rows[..]
        }
    };

    Ok(rows
        .iter()
        .map(|row| MealTarget {
            meal_name: row.meal_name.clone(),
            calories: (daily.calories * row.calories_pct / 100.0).round(),
            protein: (daily.protein_g * row.protein_pct / 100.0).round(),
            carbs: (daily.carbs_g * row.carbs_pct / 100.0).round(),
            fat: (daily.fat_g * row.fat_pct / 100.0).round(),
        })
        .collect())
}

fn validate_rows(rows: &[MealDistribution]) -> Result<(), AppError> {
    for (i, row) in rows.iter().enumerate() {
        if row.meal_name.trim().is_empty() {
            return Err(AppError::invalid_field(
                format!("distributions[{i}].mealName"),
                "must not be empty",
            ));
        }
        for (field, value) in [
            ("calories_pct", row.calories_pct),
            ("protein_pct", row.protein_pct),
            ("carbs_pct", row.carbs_pct),
            ("fat_pct", row.fat_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid_field(
                    format!("distributions[{i}].{field}"),
                    "must be a finite non-negative percentage",
                ));
            }
        }
    }

    let calorie_sum: f64 = rows.iter().map(|r| r.calories_pct).sum();
    if (calorie_sum - 100.0).abs() > PCT_SUM_TOLERANCE {
        warn!("Custom meal distribution calories_pct sums to {calorie_sum:.1}, using as supplied");
    }
    Ok(())
}
