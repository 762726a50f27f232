//! Meal-plan data model.
//!
//! Ingredient macros are ABSOLUTE values for the stated quantity. The per-100g
//! convention used by dish composition lives in `NutrientDensity` and only crosses
//! into this model through `NutrientDensity::portion`.
//!
//! Totals at every level are derived bottom-up from ingredients and are never
//! patched incrementally.

use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

pub const DAYS_OF_WEEK: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

// ────────────────────────────────────────────────────────────────────────────
// Macro arithmetic
// ────────────────────────────────────────────────────────────────────────────

/// Calories plus the three macros, in kcal and grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
        }
    }

    /// Returns the name of the first field that is negative or not finite.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
        .map(|(name, _)| name)
    }
}

impl Add for MacroTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl Sum for MacroTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Rollup shape used for day and week totals on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

impl From<MacroTotals> for NutritionSummary {
    fn from(t: MacroTotals) -> Self {
        Self {
            total_calories: t.calories,
            total_protein: t.protein,
            total_carbs: t.carbs,
            total_fat: t.fat,
        }
    }
}

impl From<NutritionSummary> for MacroTotals {
    fn from(s: NutritionSummary) -> Self {
        Self {
            calories: s.total_calories,
            protein: s.total_protein,
            carbs: s.total_carbs,
            fat: s.total_fat,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-100g boundary
// ────────────────────────────────────────────────────────────────────────────

/// Nutrient density per 100 g (or ml). Only used at the dish-composition boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientDensity {
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
}

impl NutrientDensity {
    pub const fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories_per_100g: calories,
            protein_per_100g: protein,
            carbs_per_100g: carbs,
            fat_per_100g: fat,
        }
    }

    /// Absolute macros contained in `grams` of this food.
    pub fn macros_for(&self, grams: f64) -> MacroTotals {
        let factor = grams / 100.0;
        MacroTotals {
            calories: self.calories_per_100g * factor,
            protein: self.protein_per_100g * factor,
            carbs: self.carbs_per_100g * factor,
            fat: self.fat_per_100g * factor,
        }
    }

    /// Converts a portion of this food into a canonical (absolute-value) ingredient.
    pub fn portion(&self, name: &str, grams: f64) -> Ingredient {
        let grams = round_to(grams, 1);
        let m = self.macros_for(grams);
        Ingredient {
            name: name.to_string(),
            quantity: grams,
            unit: "g".to_string(),
            calories: m.calories.round(),
            protein: round_to(m.protein, 1),
            carbs: round_to(m.carbs, 1),
            fat: round_to(m.fat, 1),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plan structure
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    /// Grams or millilitres, see `unit`.
    pub quantity: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Ingredient {
    pub fn macros(&self) -> MacroTotals {
        MacroTotals {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Slot type, e.g. "Breakfast".
    pub name: String,
    /// Display name, e.g. "Overnight oats with berries".
    #[serde(default)]
    pub custom_name: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_fat: f64,
}

impl Meal {
    /// Builds a meal whose totals are the sum of `ingredients`.
    pub fn new(name: impl Into<String>, custom_name: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
        let mut meal = Self {
            name: name.into(),
            custom_name: custom_name.into(),
            ingredients,
            total_calories: 0.0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fat: 0.0,
        };
        meal.recompute_totals();
        meal
    }

    #[cfg(test)]
    pub fn empty(slot: impl Into<String>) -> Self {
        Self::new(slot, String::new(), Vec::new())
    }

    pub fn totals(&self) -> MacroTotals {
        MacroTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            fat: self.total_fat,
        }
    }

    pub fn ingredient_sum(&self) -> MacroTotals {
        self.ingredients.iter().map(Ingredient::macros).sum()
    }

    pub fn recompute_totals(&mut self) {
        let sum = self.ingredient_sum();
        self.total_calories = sum.calories;
        self.total_protein = sum.protein;
        self.total_carbs = sum.carbs;
        self.total_fat = sum.fat;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMealPlan {
    pub day_of_week: String,
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub daily_totals: NutritionSummary,
}

impl DailyMealPlan {
    pub fn new(day_of_week: impl Into<String>, meals: Vec<Meal>) -> Self {
        let mut day = Self {
            day_of_week: day_of_week.into(),
            meals,
            daily_totals: NutritionSummary::default(),
        };
        day.recompute_totals();
        day
    }

    pub fn recompute_totals(&mut self) {
        for meal in &mut self.meals {
            meal.recompute_totals();
        }
        let sum: MacroTotals = self.meals.iter().map(Meal::totals).sum();
        self.daily_totals = sum.into();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMealPlan {
    pub days: Vec<DailyMealPlan>,
    #[serde(default)]
    pub weekly_summary: NutritionSummary,
}

impl WeeklyMealPlan {
    pub fn new(days: Vec<DailyMealPlan>) -> Self {
        let mut plan = Self {
            days,
            weekly_summary: NutritionSummary::default(),
        };
        plan.recompute_totals();
        plan
    }

    /// Seven days, each holding one empty meal per slot.
    #[cfg(test)]
    pub fn empty(slots: &[String]) -> Self {
        let days = DAYS_OF_WEEK
            .iter()
            .map(|day| DailyMealPlan::new(*day, slots.iter().map(Meal::empty).collect()))
            .collect();
        Self::new(days)
    }

    /// Re-derives every rollup from the leaf ingredients.
    pub fn recompute_totals(&mut self) {
        for day in &mut self.days {
            day.recompute_totals();
        }
        let sum: MacroTotals = self
            .days
            .iter()
            .map(|d| MacroTotals::from(d.daily_totals))
            .sum();
        self.weekly_summary = sum.into();
    }
}
