//! Planning orchestrators.
//!
//! Pipeline: validate input → build prompt → provider chain (with schema
//! repair) → deterministic fallback on exhaustion. Only local input validation
//! errors escape as `Err`; every other failure ends in a fallback-marked result.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::chain::{ChainExhausted, ChainSuccess, ProviderChain};
use crate::llm_client::GenerationRequest;
use crate::models::plan::{DailyMealPlan, MacroTotals, Meal, WeeklyMealPlan, DAYS_OF_WEEK};
use crate::models::profile::UserProfile;
use crate::nutrition::distribution::MealTarget;

use super::fallback::{proportional_scale, scale_factor, status_for, OptimizationStatus};
use super::pantry::compose_for_slot;
use super::prompt_builder::{build_prompt, BuiltPrompt, PromptRequest};
use super::responses::{
    GeneratedDay, MealAdjustmentResponse, WeeklyPlanResponse, MEAL_ADJUSTMENT_SCHEMA, WEEKLY_PLAN_SCHEMA,
};
use super::schema::{validate_and_repair, Validated};

/// Hard cap on meals per batch adjustment.
pub const MAX_BATCH_MEALS: usize = 10;

const WEEKLY_MAX_OUTPUT_TOKENS: u32 = 16_384;
const MEAL_MAX_OUTPUT_TOKENS: u32 = 2_048;

// ────────────────────────────────────────────────────────────────────────────
// Result types
// ────────────────────────────────────────────────────────────────────────────

/// How a result was produced. Lets the UI disclose degraded output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMarker {
    pub is_fallback: bool,
    pub fallback_reason: Option<String>,
    pub provider: Option<&'static str>,
    pub schema_repaired: bool,
}

impl ResultMarker {
    fn from_provider<T>(success: &ChainSuccess<Validated<T>>) -> Self {
        Self {
            is_fallback: false,
            fallback_reason: None,
            provider: Some(success.provider),
            schema_repaired: success.value.was_repaired(),
        }
    }

    fn from_exhausted(exhausted: &ChainExhausted) -> Self {
        Self {
            is_fallback: true,
            fallback_reason: Some(exhausted.reason()),
            provider: None,
            schema_repaired: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlanOutcome {
    pub plan: WeeklyMealPlan,
    /// Day×slot positions composed from the pantry rather than the provider.
    pub fallback_slots: usize,
    #[serde(flatten)]
    pub marker: ResultMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAdjustmentOutcome {
    pub meal: Meal,
    pub explanation: String,
    pub status: OptimizationStatus,
    #[serde(flatten)]
    pub marker: ResultMarker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealAdjustmentInput {
    pub meal: Meal,
    pub target: MacroTotals,
}

// ────────────────────────────────────────────────────────────────────────────
// Local input validation
// ────────────────────────────────────────────────────────────────────────────

pub fn validate_target(target: &MacroTotals, path: &str) -> Result<(), AppError> {
    match target.first_invalid_field() {
        Some(field) => Err(AppError::invalid_field(
            format!("{path}.{field}"),
            "must be a finite non-negative number",
        )),
        None => Ok(()),
    }
}

fn validate_meal(meal: &Meal, path: &str) -> Result<(), AppError> {
    if meal.ingredients.is_empty() {
        return Err(AppError::invalid_field(format!("{path}.ingredients"), "must not be empty"));
    }
    validate_ingredients(meal, path)
}

/// Field checks for every ingredient; an empty meal passes.
pub fn validate_ingredients(meal: &Meal, path: &str) -> Result<(), AppError> {
    for (i, ingredient) in meal.ingredients.iter().enumerate() {
        let at = format!("{path}.ingredients[{i}]");
        if ingredient.name.trim().is_empty() {
            return Err(AppError::invalid_field(format!("{at}.name"), "must not be empty"));
        }
        if !ingredient.quantity.is_finite() || ingredient.quantity < 0.0 {
            return Err(AppError::invalid_field(
                format!("{at}.quantity"),
                "must be a finite non-negative number",
            ));
        }
        validate_target(&ingredient.macros(), &at)?;
    }
    Ok(())
}

fn validate_meal_targets(meal_targets: &[MealTarget]) -> Result<(), AppError> {
    if meal_targets.is_empty() {
        return Err(AppError::invalid_field("meal_targets", "must not be empty"));
    }
    for (i, target) in meal_targets.iter().enumerate() {
        if target.meal_name.trim().is_empty() {
            return Err(AppError::invalid_field(format!("meal_targets[{i}].mealName"), "must not be empty"));
        }
        validate_target(&target.macros(), &format!("meal_targets[{i}]"))?;
    }
    Ok(())
}

fn request<'a>(built: &'a BuiltPrompt, timeout: Duration, max_output_tokens: u32) -> GenerationRequest<'a> {
    GenerationRequest {
        system: built.system,
        prompt: &built.prompt,
        timeout,
        max_output_tokens,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Weekly plan
// ────────────────────────────────────────────────────────────────────────────

/// Generates a 7-day plan with one meal per target slot.
///
/// Slots the provider leaves out (or the whole week, when every provider fails)
/// are composed from the pantry.
pub async fn generate_weekly_plan(
    providers: &ProviderChain,
    timeout: Duration,
    profile: &UserProfile,
    meal_targets: &[MealTarget],
) -> Result<WeeklyPlanOutcome, AppError> {
    validate_meal_targets(meal_targets)?;
    info!(
        "Generating weekly plan: {} slots/day via {:?}",
        meal_targets.len(),
        providers.provider_names()
    );

    let built = build_prompt(PromptRequest::WeeklyPlan { meal_targets }, profile);
    let result = providers
        .generate_validated(&request(&built, timeout, WEEKLY_MAX_OUTPUT_TOKENS), |raw| {
            validate_and_repair::<WeeklyPlanResponse>(raw.as_str(), &WEEKLY_PLAN_SCHEMA)
        })
        .await;

    let outcome = match result {
        Ok(success) => {
            let mut marker = ResultMarker::from_provider(&success);
            let generated = success.value.value.weekly_meal_plan;
            let (plan, fallback_slots) = assemble_week(generated, meal_targets, profile);
            if fallback_slots > 0 {
                let total = DAYS_OF_WEEK.len() * meal_targets.len();
                warn!("Provider omitted {fallback_slots} of {total} meal slots, filled from pantry");
                marker.fallback_reason = Some(format!(
                    "provider omitted {fallback_slots} of {total} meal slots"
                ));
            }
            WeeklyPlanOutcome {
                plan,
                fallback_slots,
                marker,
            }
        }
        Err(exhausted) => {
            warn!("Weekly plan falling back to pantry: {}", exhausted.reason());
            let (plan, fallback_slots) = assemble_week(Vec::new(), meal_targets, profile);
            WeeklyPlanOutcome {
                plan,
                fallback_slots,
                marker: ResultMarker::from_exhausted(&exhausted),
            }
        }
    };
    Ok(outcome)
}

fn day_matches(label: &str, day: &str) -> bool {
    let label = label.trim().to_lowercase();
    day.get(..3)
        .is_some_and(|prefix| label.starts_with(&prefix.to_lowercase()))
}

/// Orders provider days Monday..Sunday: by name first, then unclaimed days by position.
fn align_days(generated: Vec<GeneratedDay>) -> Vec<Option<GeneratedDay>> {
    let mut pool: Vec<Option<GeneratedDay>> = generated.into_iter().map(Some).collect();
    let mut aligned: Vec<Option<GeneratedDay>> = DAYS_OF_WEEK
        .iter()
        .map(|day| {
            pool.iter()
                .position(|g| g.as_ref().is_some_and(|g| day_matches(&g.day, day)))
                .and_then(|i| pool[i].take())
        })
        .collect();

    let mut leftovers = pool.into_iter().flatten();
    for slot in aligned.iter_mut().filter(|s| s.is_none()) {
        *slot = leftovers.next();
    }
    aligned
}

/// Builds the canonical week. Returns the plan and the number of pantry-filled slots.
fn assemble_week(
    generated: Vec<GeneratedDay>,
    meal_targets: &[MealTarget],
    profile: &UserProfile,
) -> (WeeklyMealPlan, usize) {
    let mut fallback_slots = 0;
    let days = align_days(generated)
        .into_iter()
        .zip(DAYS_OF_WEEK)
        .enumerate()
        .map(|(day_index, (generated_day, day_name))| {
            let mut provided = generated_day.map(|d| d.meals).unwrap_or_default().into_iter();
            let meals: Vec<Meal> = meal_targets
                .iter()
                .enumerate()
                .map(|(slot_index, target)| match provided.next() {
                    Some(meal) => meal.into_meal(&target.meal_name),
                    None => {
                        fallback_slots += 1;
                        compose_for_slot(&target.meal_name, day_index, slot_index, &target.macros(), profile).meal
                    }
                })
                .collect();
            let extra = provided.count();
            if extra > 0 {
                warn!("Dropped {extra} extra meal(s) on {day_name}");
            }
            DailyMealPlan::new(day_name, meals)
        })
        .collect();
    (WeeklyMealPlan::new(days), fallback_slots)
}

// ────────────────────────────────────────────────────────────────────────────
// Single meal
// ────────────────────────────────────────────────────────────────────────────

/// Adjusts ingredient quantities of `meal` toward `target`.
pub async fn adjust_single_meal(
    providers: &ProviderChain,
    timeout: Duration,
    meal: &Meal,
    target: &MacroTotals,
    profile: &UserProfile,
) -> Result<MealAdjustmentOutcome, AppError> {
    validate_meal(meal, "meal")?;
    validate_target(target, "target")?;
    Ok(adjust_validated(providers, timeout, meal, target, profile).await)
}

async fn adjust_validated(
    providers: &ProviderChain,
    timeout: Duration,
    meal: &Meal,
    target: &MacroTotals,
    profile: &UserProfile,
) -> MealAdjustmentOutcome {
    let built = build_prompt(PromptRequest::MealAdjustment { meal, target }, profile);
    let result = providers
        .generate_validated(&request(&built, timeout, MEAL_MAX_OUTPUT_TOKENS), |raw| {
            validate_and_repair::<MealAdjustmentResponse>(raw.as_str(), &MEAL_ADJUSTMENT_SCHEMA)
        })
        .await;

    match result {
        Ok(success) => {
            let marker = ResultMarker::from_provider(&success);
            let response = success.value.value;
            let adjusted = canonical_adjustment(meal, response.adjusted_meal);
            MealAdjustmentOutcome {
                status: status_for(&adjusted.totals(), target),
                meal: adjusted,
                explanation: response.explanation,
                marker,
            }
        }
        Err(exhausted) => {
            warn!("Meal adjustment for {} falling back to scaling: {}", meal.name, exhausted.reason());
            let scaled = proportional_scale(meal, target);
            let factor = scale_factor(meal.ingredient_sum().calories, target.calories);
            MealAdjustmentOutcome {
                explanation: format!(
                    "Ingredient quantities were scaled proportionally (x{factor:.2}) to reach the calorie target."
                ),
                meal: scaled.meal,
                status: scaled.status,
                marker: ResultMarker::from_exhausted(&exhausted),
            }
        }
    }
}

/// Keeps the original slot and display name, recomputes totals, logs ingredient drift.
fn canonical_adjustment(original: &Meal, adjusted: Meal) -> Meal {
    let known: HashSet<String> = original
        .ingredients
        .iter()
        .map(|i| i.name.trim().to_lowercase())
        .collect();
    let introduced: Vec<&str> = adjusted
        .ingredients
        .iter()
        .filter(|i| !known.contains(&i.name.trim().to_lowercase()))
        .map(|i| i.name.as_str())
        .collect();
    if !introduced.is_empty() {
        warn!(
            "Provider introduced ingredients not in {}: {:?}",
            original.name, introduced
        );
    }

    let custom_name = if adjusted.custom_name.trim().is_empty() {
        original.custom_name.clone()
    } else {
        adjusted.custom_name
    };
    Meal::new(original.name.clone(), custom_name, adjusted.ingredients)
}

/// Adjusts up to `MAX_BATCH_MEALS` meals one after another.
/// The whole batch is validated before any provider call.
pub async fn adjust_meals_batch(
    providers: &ProviderChain,
    timeout: Duration,
    inputs: &[MealAdjustmentInput],
    profile: &UserProfile,
) -> Result<Vec<MealAdjustmentOutcome>, AppError> {
    if inputs.is_empty() {
        return Err(AppError::invalid_field("meals", "must not be empty"));
    }
    if inputs.len() > MAX_BATCH_MEALS {
        return Err(AppError::invalid_field(
            "meals",
            format!("must contain at most {MAX_BATCH_MEALS} entries (got {})", inputs.len()),
        ));
    }
    for (i, input) in inputs.iter().enumerate() {
        validate_meal(&input.meal, &format!("meals[{i}].meal"))?;
        validate_target(&input.target, &format!("meals[{i}].target"))?;
    }

    let mut outcomes = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        info!("Batch adjustment {}/{}: {}", i + 1, inputs.len(), input.meal.name);
        outcomes.push(adjust_validated(providers, timeout, &input.meal, &input.target, profile).await);
    }
    Ok(outcomes)
}
