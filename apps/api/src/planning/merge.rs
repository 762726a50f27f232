//! Plan merge: copy, replace one slot, recompute every rollup.
//!
//! Both functions are pure. The input plan is never touched, so merging the
//! same meal into the same slot twice yields the same plan.

use crate::errors::AppError;
use crate::models::plan::{DailyMealPlan, Meal, WeeklyMealPlan};

pub fn merge_meal_into_plan(
    plan: &WeeklyMealPlan,
    day_index: usize,
    meal_index: usize,
    meal: Meal,
) -> Result<WeeklyMealPlan, AppError> {
    check_slot(plan, day_index, meal_index)?;
    let mut merged = plan.clone();
    merged.days[day_index].meals[meal_index] = meal;

    merged.recompute_totals();
    Ok(merged)
}

/// Fails with a validation error unless `plan` has a meal at (day, meal).
pub fn check_slot(plan: &WeeklyMealPlan, day_index: usize, meal_index: usize) -> Result<(), AppError> {
    let day = plan
        .days
        .get(day_index)
        .ok_or_else(|| out_of_range("day_index", day_index, plan.days.len()))?;
    if meal_index >= day.meals.len() {
        return Err(out_of_range("meal_index", meal_index, day.meals.len()));
    }
    Ok(())
}

pub fn merge_day_into_plan(
    plan: &WeeklyMealPlan,
    day_index: usize,
    day: DailyMealPlan,
) -> Result<WeeklyMealPlan, AppError> {
    let mut merged = plan.clone();
    let day_count = merged.days.len();
    let slot = merged
        .days
        .get_mut(day_index)
        .ok_or_else(|| out_of_range("day_index", day_index, day_count))?;
    *slot = day;

    merged.recompute_totals();
    Ok(merged)
}

fn out_of_range(field: &str, index: usize, len: usize) -> AppError {
    AppError::invalid_field(field, format!("{index} is out of range (plan has {len})"))
}
