//! Provider response contracts and the schemas that guard them.
//!
//! Field names below are the wire contract the prompts demand; the alias lists
//! are the variants providers actually send.

use serde::{Deserialize, Serialize};

use super::schema::{FieldKind, FieldSpec, ResponseSchema};
use crate::models::plan::{Ingredient, Meal};

const CALORIES: &[&str] = &["kcal", "calorie", "energy", "total_calories"];
const PROTEIN: &[&str] = &["protein_g", "proteins"];
const CARBS: &[&str] = &["carbs_g", "carbohydrates", "carbohydrates_g", "carbohydrate"];
const FAT: &[&str] = &["fat_g", "fats", "total_fat"];
const INGREDIENT_NAME: &[&str] = &["ingredient", "ingredient_name", "item", "food"];

// ────────────────────────────────────────────────────────────────────────────
// Full-week generation
// ────────────────────────────────────────────────────────────────────────────

const WEEK_INGREDIENT: &[FieldSpec] = &[
    FieldSpec::text("name", INGREDIENT_NAME),
    FieldSpec::number("quantity", &["amount", "grams", "quantity_g"]).optional(),
    FieldSpec::text("unit", &["units"]).optional(),
    FieldSpec::number("calories", CALORIES),
    FieldSpec::number("protein", PROTEIN),
    FieldSpec::number("carbs", CARBS),
    FieldSpec::number("fat", FAT),
];

const WEEK_MEAL: &[FieldSpec] = &[
    FieldSpec::text(
        "meal_title",
        &["meal_name", "meal_type", "title", "name", "custom_name", "meal"],
    ),
    FieldSpec {
        name: "ingredients",
        aliases: &["ingredient_list", "items", "foods"],
        kind: FieldKind::List {
            fields: WEEK_INGREDIENT,
            min_items: 1,
        },
        required: true,
    },
];

const WEEK_DAY: &[FieldSpec] = &[
    FieldSpec::text("day", &["day_of_week", "dayOfWeek", "day_name", "weekday"]),
    FieldSpec {
        name: "meals",
        aliases: &["meal_list", "dailyMeals", "daily_meals"],
        kind: FieldKind::List {
            fields: WEEK_MEAL,
            min_items: 1,
        },
        required: true,
    },
];

pub static WEEKLY_PLAN_SCHEMA: ResponseSchema = ResponseSchema {
    name: "weekly meal plan",
    root: &[FieldSpec {
        name: "weeklyMealPlan",
        aliases: &["weekly_meal_plan", "mealPlan", "meal_plan", "days", "week"],
        kind: FieldKind::List {
            fields: WEEK_DAY,
            min_items: 1,
        },
        required: true,
    }],
    bare_array_field: Some("weeklyMealPlan"),
    inline_object_field: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPlanResponse {
    #[serde(rename = "weeklyMealPlan")]
    pub weekly_meal_plan: Vec<GeneratedDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDay {
    pub day: String,
    pub meals: Vec<GeneratedMeal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMeal {
    pub meal_title: String,
    pub ingredients: Vec<GeneratedIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedIngredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl GeneratedIngredient {
    pub fn into_ingredient(self) -> Ingredient {
        Ingredient {
            name: self.name,
            quantity: self.quantity.unwrap_or(0.0),
            unit: self
                .unit
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| "g".to_string()),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

impl GeneratedMeal {
    /// Converts into a canonical meal for `slot`. Totals are recomputed, never copied.
    pub fn into_meal(self, slot: &str) -> Meal {
        let ingredients = self
            .ingredients
            .into_iter()
            .map(GeneratedIngredient::into_ingredient)
            .collect();
        Meal::new(slot, self.meal_title, ingredients)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Single-meal adjustment
// ────────────────────────────────────────────────────────────────────────────

const MEAL_INGREDIENT: &[FieldSpec] = &[
    FieldSpec::text("name", INGREDIENT_NAME),
    FieldSpec::number("quantity", &["amount", "grams", "quantity_g", "new_quantity", "adjusted_quantity"]),
    FieldSpec::text("unit", &["units"]),
    FieldSpec::number("calories", CALORIES),
    FieldSpec::number("protein", PROTEIN),
    FieldSpec::number("carbs", CARBS),
    FieldSpec::number("fat", FAT),
];

const ADJUSTED_MEAL: &[FieldSpec] = &[
    FieldSpec::text("name", &["meal_name", "meal_type", "slot"]),
    FieldSpec::text("custom_name", &["customName", "title", "meal_title", "display_name"]),
    FieldSpec {
        name: "ingredients",
        aliases: &["ingredient_list", "items", "adjusted_ingredients"],
        kind: FieldKind::List {
            fields: MEAL_INGREDIENT,
            min_items: 1,
        },
        required: true,
    },
    FieldSpec::number("total_calories", &["totalCalories", "calories"]),
    FieldSpec::number("total_protein", &["totalProtein", "protein"]),
    FieldSpec::number("total_carbs", &["totalCarbs", "carbs"]),
    FieldSpec::number("total_fat", &["totalFat", "fat"]),
];

pub static MEAL_ADJUSTMENT_SCHEMA: ResponseSchema = ResponseSchema {
    name: "meal adjustment",
    root: &[
        FieldSpec {
            name: "adjustedMeal",
            aliases: &["adjusted_meal", "optimized_meal", "optimizedMeal", "meal"],
            kind: FieldKind::Object(ADJUSTED_MEAL),
            required: true,
        },
        FieldSpec::text("explanation", &["notes", "reasoning", "rationale"]),
    ],
    bare_array_field: None,
    inline_object_field: Some("adjustedMeal"),
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealAdjustmentResponse {
    #[serde(rename = "adjustedMeal")]
    pub adjusted_meal: Meal,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::planning::schema::{validate_and_repair, SchemaError, Validated};

    fn canonical_week() -> serde_json::Value {
        json!({"weeklyMealPlan": [{
            "day": "Monday",
            "meals": [{
                "meal_title": "Oats and berries",
                "ingredients": [{"name": "oats", "calories": 150, "protein": 5, "carbs": 27, "fat": 3}]
            }]
        }]})
    }

    #[test]
    fn test_canonical_week_validates_without_repair() {
        let out: Validated<WeeklyPlanResponse> =
            validate_and_repair(&canonical_week().to_string(), &WEEKLY_PLAN_SCHEMA).unwrap();
        assert!(!out.was_repaired());
        assert_eq!(out.value.weekly_meal_plan[0].meals[0].meal_title, "Oats and berries");
    }

    #[test]
    fn test_day_of_week_and_meal_type_repair_to_valid() {
        let raw = json!({"weeklyMealPlan": [{
            "day_of_week": "Tuesday",
            "meals": [{
                "meal_type": "Breakfast",
                "ingredients": [{"name": "eggs", "calories": 140, "protein": 12, "carbs": 1, "fat": 10}]
            }]
        }]})
        .to_string();
        let out: Validated<WeeklyPlanResponse> = validate_and_repair(&raw, &WEEKLY_PLAN_SCHEMA).unwrap();
        assert!(out.was_repaired());
        let day = &out.value.weekly_meal_plan[0];
        assert_eq!(day.day, "Tuesday");
        assert_eq!(day.meals[0].meal_title, "Breakfast");
    }

    #[test]
    fn test_day_and_meal_name_repair_to_valid() {
        let raw = json!({"days": [{
            "dayOfWeek": "Friday",
            "meals": [{
                "meal_name": "Lentil soup",
                "ingredients": [{"ingredient": "lentils", "kcal": "230", "protein_g": 18, "carbohydrates": 40, "fats": 1}]
            }]
        }]})
        .to_string();
        let out: Validated<WeeklyPlanResponse> = validate_and_repair(&raw, &WEEKLY_PLAN_SCHEMA).unwrap();
        let ing = &out.value.weekly_meal_plan[0].meals[0].ingredients[0];
        assert_eq!(ing.name, "lentils");
        assert_eq!(ing.calories, 230.0);
        assert_eq!(ing.carbs, 40.0);
    }

    #[test]
    fn test_meals_without_ingredients_are_dropped() {
        let raw = json!({"weeklyMealPlan": [
            {"day": "Monday", "meals": [{"meal_title": "Ghost", "ingredients": []}]},
            {"day": "Tuesday", "meals": [
                {"meal_title": "Ghost", "ingredients": []},
                {"meal_title": "Real", "ingredients": [{"name": "rice", "calories": 200, "protein": 4, "carbs": 44, "fat": 0}]}
            ]}
        ]})
        .to_string();
        let out: Validated<WeeklyPlanResponse> = validate_and_repair(&raw, &WEEKLY_PLAN_SCHEMA).unwrap();
        assert_eq!(out.value.weekly_meal_plan.len(), 1);
        assert_eq!(out.value.weekly_meal_plan[0].day, "Tuesday");
        assert_eq!(out.value.weekly_meal_plan[0].meals.len(), 1);
    }

    #[test]
    fn test_not_json_is_invalid_json() {
        let err = validate_and_repair::<WeeklyPlanResponse>("not json", &WEEKLY_PLAN_SCHEMA).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }

    #[test]
    fn test_generated_meal_recomputes_totals() {
        let meal = GeneratedMeal {
            meal_title: "Rice bowl".to_string(),
            ingredients: vec![
                GeneratedIngredient {
                    name: "rice".to_string(),
                    quantity: Some(150.0),
                    unit: None,
                    calories: 195.0,
                    protein: 4.0,
                    carbs: 42.0,
                    fat: 0.5,
                },
                GeneratedIngredient {
                    name: "tofu".to_string(),
                    quantity: None,
                    unit: Some("g".to_string()),
                    calories: 144.0,
                    protein: 17.0,
                    carbs: 3.0,
                    fat: 9.0,
                },
            ],
        }
        .into_meal("Lunch");
        assert_eq!(meal.name, "Lunch");
        assert_eq!(meal.custom_name, "Rice bowl");
        assert_eq!(meal.total_calories, 339.0);
        assert_eq!(meal.ingredients[0].unit, "g");
        assert_eq!(meal.ingredients[1].quantity, 0.0);
    }

    #[test]
    fn test_optimized_meal_wrapper_is_renamed() {
        let raw = json!({
            "optimized_meal": {
                "name": "Lunch",
                "custom_name": "Chicken rice",
                "ingredients": [{"name": "chicken", "quantity": 150, "unit": "g", "calories": 248, "protein": 46, "carbs": 0, "fat": 5}],
                "total_calories": 248, "total_protein": 46, "total_carbs": 0, "total_fat": 5
            },
            "explanation": "scaled"
        })
        .to_string();
        let out: Validated<MealAdjustmentResponse> = validate_and_repair(&raw, &MEAL_ADJUSTMENT_SCHEMA).unwrap();
        assert_eq!(out.value.adjusted_meal.custom_name, "Chicken rice");
        assert_eq!(out.value.explanation, "scaled");
    }

    #[test]
    fn test_flat_meal_is_nested_and_defaults_filled() {
        let raw = json!({
            "name": "Dinner",
            "ingredients": [{"name": "salmon", "quantity": 120, "unit": "g", "calories": 250, "protein": 24, "carbs": 0, "fat": 16}]
        })
        .to_string();
        let out: Validated<MealAdjustmentResponse> = validate_and_repair(&raw, &MEAL_ADJUSTMENT_SCHEMA).unwrap();
        let meal = &out.value.adjusted_meal;
        assert_eq!(meal.name, "Dinner");
        assert_eq!(meal.custom_name, "");
        assert_eq!(meal.total_calories, 0.0);
        assert_eq!(out.value.explanation, "");
        assert!(out.was_repaired());
    }

    #[test]
    fn test_meal_with_no_ingredients_is_a_shape_mismatch() {
        let raw = json!({"adjustedMeal": {"name": "Lunch", "ingredients": []}, "explanation": ""}).to_string();
        let err = validate_and_repair::<MealAdjustmentResponse>(&raw, &MEAL_ADJUSTMENT_SCHEMA).unwrap_err();
        match err {
            SchemaError::ShapeMismatch { violations, .. } => {
                assert!(violations.iter().any(|v| v.path == "$.adjustedMeal.ingredients"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
