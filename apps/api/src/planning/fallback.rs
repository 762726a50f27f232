//! Deterministic Fallback Optimizer.
//!
//! No I/O and no error type: every entry point returns a usable meal.
//!
//! - `proportional_scale` adjusts an existing meal by one calorie-derived factor.
//! - `compose_dish` builds a dish from per-100g candidates by randomized search.
//!   It is a stochastic local optimizer, not a linear program: with a fixed
//!   iteration budget it finds a good sample, not a provably optimal one.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::plan::{round_to, Ingredient, MacroTotals, Meal, NutrientDensity};

/// Per-macro relative tolerance for an "Optimal" proportional result.
pub const PROPORTIONAL_TOLERANCE: f64 = 0.05;

/// Deviation weights. Protein and fat are harder to hit than raw calories.
const WEIGHT_CALORIES: f64 = 1.0;
const WEIGHT_PROTEIN: f64 = 3.0;
const WEIGHT_CARBS: f64 = 2.0;
const WEIGHT_FAT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    #[serde(rename = "Optimal")]
    Optimal,
    #[serde(rename = "Near Optimal")]
    NearOptimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackResult {
    pub meal: Meal,
    pub status: OptimizationStatus,
    /// Weighted absolute deviation of the returned meal from the target.
    pub deviation: f64,
}

pub fn weighted_deviation(actual: &MacroTotals, target: &MacroTotals) -> f64 {
    WEIGHT_CALORIES * (actual.calories - target.calories).abs()
        + WEIGHT_PROTEIN * (actual.protein - target.protein).abs()
        + WEIGHT_CARBS * (actual.carbs - target.carbs).abs()
        + WEIGHT_FAT * (actual.fat - target.fat).abs()
}

fn within_tolerance(actual: f64, target: f64) -> bool {
    if target <= 0.0 {
        actual.abs() < 0.5
    } else {
        (actual - target).abs() / target <= PROPORTIONAL_TOLERANCE
    }
}

fn all_within_tolerance(actual: &MacroTotals, target: &MacroTotals) -> bool {
    within_tolerance(actual.calories, target.calories)
        && within_tolerance(actual.protein, target.protein)
        && within_tolerance(actual.carbs, target.carbs)
        && within_tolerance(actual.fat, target.fat)
}

/// `Optimal` when every macro is within `PROPORTIONAL_TOLERANCE` of the target.
pub fn status_for(actual: &MacroTotals, target: &MacroTotals) -> OptimizationStatus {
    if all_within_tolerance(actual, target) {
        OptimizationStatus::Optimal
    } else {
        OptimizationStatus::NearOptimal
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Proportional scaling
// ────────────────────────────────────────────────────────────────────────────

/// Scale factor that brings `current_calories` to `target_calories`; 1 when undefined.
pub fn scale_factor(current_calories: f64, target_calories: f64) -> f64 {
    if current_calories > 0.0 && current_calories.is_finite() && target_calories.is_finite() {
        target_calories / current_calories
    } else {
        1.0
    }
}

fn scale_ingredient(ingredient: &Ingredient, factor: f64) -> Ingredient {
    Ingredient {
        name: ingredient.name.clone(),
        quantity: round_to(ingredient.quantity * factor, 1),
        unit: ingredient.unit.clone(),
        calories: (ingredient.calories * factor).round(),
        protein: round_to(ingredient.protein * factor, 1),
        carbs: round_to(ingredient.carbs * factor, 1),
        fat: round_to(ingredient.fat * factor, 1),
    }
}

/// Scales every ingredient of `meal` by `target.calories / current calories`.
/// Totals are the exact sum of the scaled ingredients, never the target itself.
pub fn proportional_scale(meal: &Meal, target: &MacroTotals) -> FallbackResult {
    let current = meal.ingredient_sum();
    let factor = scale_factor(current.calories, target.calories);

    let ingredients = if factor == 1.0 {
        meal.ingredients.clone()
    } else {
        meal.ingredients
            .iter()
            .map(|i| scale_ingredient(i, factor))
            .collect()
    };
    let adjusted = Meal::new(meal.name.clone(), meal.custom_name.clone(), ingredients);

    let totals = adjusted.totals();
    FallbackResult {
        deviation: weighted_deviation(&totals, target),
        status: status_for(&totals, target),
        meal: adjusted,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Randomized search
// ────────────────────────────────────────────────────────────────────────────

/// A food that can go into a composed dish, with its reference serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    #[serde(flatten)]
    pub density: NutrientDensity,
    /// Grams at multiplier 1.0.
    pub serving_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub iterations: usize,
    pub tolerance: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            tolerance: 1.0,
            min_multiplier: 0.25,
            max_multiplier: 2.5,
        }
    }
}

fn portion_grams(candidates: &[Candidate], multipliers: &[f64]) -> Vec<f64> {
    candidates
        .iter()
        .zip(multipliers)
        .map(|(c, m)| c.serving_g * m)
        .collect()
}

fn totals_for(candidates: &[Candidate], grams: &[f64]) -> MacroTotals {
    candidates
        .iter()
        .zip(grams)
        .map(|(c, g)| c.density.macros_for(*g))
        .sum()
}

/// Samples random serving multipliers and keeps the best-scoring set.
pub fn compose_dish<R: Rng>(
    slot: &str,
    dish_name: &str,
    candidates: &[Candidate],
    target: &MacroTotals,
    config: &SearchConfig,
    rng: &mut R,
) -> FallbackResult {
    let usable: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.serving_g.is_finite() && c.serving_g > 0.0)
        .cloned()
        .collect();

    let (low, high) = if config.min_multiplier <= config.max_multiplier {
        (config.min_multiplier, config.max_multiplier)
    } else {
        (config.max_multiplier, config.min_multiplier)
    };

    let mut best = vec![1.0; usable.len()];
    let mut best_score = weighted_deviation(&totals_for(&usable, &portion_grams(&usable, &best)), target);

    if !usable.is_empty() {
        for _ in 0..config.iterations {
            if best_score <= config.tolerance {
                break;
            }
            let sample: Vec<f64> = usable.iter().map(|_| rng.gen_range(low..=high)).collect();
            let score = weighted_deviation(&totals_for(&usable, &portion_grams(&usable, &sample)), target);
            if score < best_score {
                best_score = score;
                best = sample;
            }
        }
    }

    let ingredients: Vec<Ingredient> = usable
        .iter()
        .zip(portion_grams(&usable, &best))
        .map(|(c, grams)| c.density.portion(&c.name, grams))
        .collect();
    let meal = Meal::new(slot, dish_name, ingredients);
    let deviation = weighted_deviation(&meal.totals(), target);

    FallbackResult {
        meal,
        status: if best_score <= config.tolerance {
            OptimizationStatus::Optimal
        } else {
            OptimizationStatus::NearOptimal
        },
        deviation,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::models::plan::fixtures::ingredient;

    fn target(calories: f64, protein: f64, carbs: f64, fat: f64) -> MacroTotals {
        MacroTotals {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    fn two_ingredient_meal() -> Meal {
        Meal::new(
            "Lunch",
            "Chicken and rice",
            vec![
                ingredient("chicken", 100.0, 120.0, 22.0, 0.0, 3.0),
                ingredient("rice", 60.0, 80.0, 2.0, 17.0, 0.4),
            ],
        )
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate {
                name: "chicken breast".to_string(),
                density: NutrientDensity::new(165.0, 31.0, 0.0, 3.6),
                serving_g: 120.0,
            },
            Candidate {
                name: "white rice, cooked".to_string(),
                density: NutrientDensity::new(130.0, 2.7, 28.2, 0.3),
                serving_g: 150.0,
            },
            Candidate {
                name: "olive oil".to_string(),
                density: NutrientDensity::new(884.0, 0.0, 0.0, 100.0),
                serving_g: 10.0,
            },
        ]
    }

    #[test]
    fn test_scale_200_to_300_kcal() {
        let result = proportional_scale(&two_ingredient_meal(), &target(300.0, 36.0, 25.5, 5.1));
        let meal = &result.meal;
        assert_eq!(meal.ingredients[0].quantity, 150.0);
        assert_eq!(meal.ingredients[0].calories, 180.0);
        assert_eq!(meal.ingredients[1].quantity, 90.0);
        assert_eq!(meal.ingredients[1].calories, 120.0);
        assert_eq!(meal.total_calories, 300.0);
        assert_eq!(meal.custom_name, "Chicken and rice");
    }

    #[test]
    fn test_null_adjustment_keeps_quantities() {
        let meal = Meal::new(
            "Snack",
            "",
            vec![ingredient("almonds", 28.35, 164.0, 6.0, 6.1, 14.2)],
        );
        let result = proportional_scale(&meal, &target(164.0, 6.0, 6.1, 14.2));
        assert_eq!(result.meal.ingredients, meal.ingredients);
        assert_eq!(result.status, OptimizationStatus::Optimal);
    }

    #[test]
    fn test_zero_calorie_meal_uses_factor_one() {
        let meal = Meal::new("Snack", "", vec![ingredient("water", 250.0, 0.0, 0.0, 0.0, 0.0)]);
        let result = proportional_scale(&meal, &target(200.0, 10.0, 20.0, 5.0));
        assert_eq!(result.meal.ingredients[0].quantity, 250.0);
        assert_eq!(result.status, OptimizationStatus::NearOptimal);
    }

    #[test]
    fn test_scaled_totals_equal_ingredient_sum() {
        for kcal in [137.0, 333.0, 512.0, 919.0] {
            let result = proportional_scale(&two_ingredient_meal(), &target(kcal, 30.0, 30.0, 10.0));
            let sum = result.meal.ingredient_sum();
            assert_eq!(result.meal.total_calories, sum.calories);
            assert_eq!(result.meal.total_protein, sum.protein);
            assert_eq!(result.meal.total_carbs, sum.carbs);
            assert_eq!(result.meal.total_fat, sum.fat);
        }
    }

    #[test]
    fn test_proportional_status_reflects_macro_mismatch() {
        // calories hit exactly, protein far off
        let result = proportional_scale(&two_ingredient_meal(), &target(300.0, 80.0, 25.5, 5.1));
        assert_eq!(result.status, OptimizationStatus::NearOptimal);
    }

    #[test]
    fn test_weighted_deviation_weights() {
        let zero = MacroTotals::default();
        assert_eq!(weighted_deviation(&target(1.0, 0.0, 0.0, 0.0), &zero), 1.0);
        assert_eq!(weighted_deviation(&target(0.0, 1.0, 0.0, 0.0), &zero), 3.0);
        assert_eq!(weighted_deviation(&target(0.0, 0.0, 1.0, 0.0), &zero), 2.0);
        assert_eq!(weighted_deviation(&target(0.0, 0.0, 0.0, 1.0), &zero), 3.0);
    }

    #[test]
    fn test_compose_dish_improves_on_reference_servings() {
        let goal = target(600.0, 45.0, 55.0, 18.0);
        let pool = candidates();
        let baseline = weighted_deviation(
            &totals_for(&pool, &portion_grams(&pool, &[1.0, 1.0, 1.0])),
            &goal,
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = compose_dish("Lunch", "Chicken rice bowl", &pool, &goal, &SearchConfig::default(), &mut rng);

        assert_eq!(result.meal.ingredients.len(), 3);
        assert_eq!(result.meal.custom_name, "Chicken rice bowl");
        assert!(result.deviation < baseline);
        let sum = result.meal.ingredient_sum();
        assert_eq!(result.meal.total_calories, sum.calories);
    }

    #[test]
    fn test_compose_dish_is_reproducible_for_a_seed() {
        let goal = target(450.0, 30.0, 40.0, 15.0);
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            compose_dish("Dinner", "Bowl", &candidates(), &goal, &SearchConfig::default(), &mut rng)
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_compose_dish_multipliers_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = SearchConfig::default();
        let result = compose_dish(
            "Snack",
            "Oil shot",
            &candidates()[2..],
            &target(5000.0, 0.0, 0.0, 500.0),
            &config,
            &mut rng,
        );
        let grams = result.meal.ingredients[0].quantity;
        assert!(grams <= 10.0 * config.max_multiplier + 0.05);
        assert_eq!(result.status, OptimizationStatus::NearOptimal);
    }

    #[test]
    fn test_compose_dish_without_candidates_returns_empty_meal() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = compose_dish(
            "Snack",
            "Nothing",
            &[],
            &target(200.0, 10.0, 20.0, 5.0),
            &SearchConfig::default(),
            &mut rng,
        );
        assert!(result.meal.ingredients.is_empty());
        assert_eq!(result.status, OptimizationStatus::NearOptimal);
    }
}
