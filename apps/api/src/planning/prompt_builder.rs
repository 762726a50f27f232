//! Prompt Builder: renders targets, the user's restrictions and (for adjustments)
//! the existing meal into the planning prompt templates.
//!
//! Every numeric target and every required JSON field name is restated verbatim
//! in the prompt text, because the validator rejects deviations.

use crate::llm_client::prompts::NUMERIC_RULES;
use crate::models::plan::{round_to, MacroTotals, Meal, DAYS_OF_WEEK};
use crate::models::profile::{DietGoal, UserProfile};
use crate::nutrition::distribution::MealTarget;

use super::prompts::{
    MEAL_ADJUSTMENT_PROMPT_TEMPLATE, MEAL_ADJUSTMENT_SYSTEM, WEEKLY_PLAN_PROMPT_TEMPLATE, WEEKLY_PLAN_SYSTEM,
};

#[derive(Debug, Clone, Copy)]
pub enum PromptRequest<'a> {
    MealAdjustment {
        meal: &'a Meal,
        target: &'a MacroTotals,
    },
    WeeklyPlan {
        meal_targets: &'a [MealTarget],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub system: &'static str,
    pub prompt: String,
}

pub fn build_prompt(request: PromptRequest<'_>, profile: &UserProfile) -> BuiltPrompt {
    match request {
        PromptRequest::MealAdjustment { meal, target } => BuiltPrompt {
            system: MEAL_ADJUSTMENT_SYSTEM,
            prompt: meal_adjustment_prompt(meal, target, profile),
        },
        PromptRequest::WeeklyPlan { meal_targets } => BuiltPrompt {
            system: WEEKLY_PLAN_SYSTEM,
            prompt: weekly_plan_prompt(meal_targets, profile),
        },
    }
}

fn meal_adjustment_prompt(meal: &Meal, target: &MacroTotals, profile: &UserProfile) -> String {
    let ingredients = meal
        .ingredients
        .iter()
        .map(|i| {
            format!(
                "- {}: {}{} ({} kcal, protein {}g, carbs {}g, fat {}g)",
                i.name,
                num(i.quantity),
                i.unit,
                num(i.calories),
                num(i.protein),
                num(i.carbs),
                num(i.fat)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    MEAL_ADJUSTMENT_PROMPT_TEMPLATE
        .replace("{numeric_rules}", NUMERIC_RULES)
        .replace("{meal_name}", &meal.name)
        .replace("{custom_name}", &meal.custom_name)
        .replace("{ingredients}", &ingredients)
        .replace("{current_totals}", &macro_line(&meal.ingredient_sum()))
        .replace("{target_calories}", &num(target.calories))
        .replace("{target_protein}", &num(target.protein))
        .replace("{target_carbs}", &num(target.carbs))
        .replace("{target_fat}", &num(target.fat))
        .replace("{profile}", &profile_section(profile))
}

fn weekly_plan_prompt(meal_targets: &[MealTarget], profile: &UserProfile) -> String {
    let slot_targets = meal_targets
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}: {}", i + 1, t.meal_name, macro_line(&t.macros())))
        .collect::<Vec<_>>()
        .join("\n");
    let daily: MacroTotals = meal_targets.iter().map(MealTarget::macros).sum();

    WEEKLY_PLAN_PROMPT_TEMPLATE
        .replace("{numeric_rules}", NUMERIC_RULES)
        .replace("{days}", &DAYS_OF_WEEK.join(", "))
        .replace("{meal_count}", &meal_targets.len().to_string())
        .replace("{slot_targets}", &slot_targets)
        .replace("{daily_totals}", &macro_line(&daily))
        .replace("{weekly_totals}", &macro_line(&daily.scaled(DAYS_OF_WEEK.len() as f64)))
        .replace("{profile}", &profile_section(profile))
}

fn macro_line(m: &MacroTotals) -> String {
    format!(
        "calories {} kcal, protein {} g, carbs {} g, fat {} g",
        num(m.calories),
        num(m.protein),
        num(m.carbs),
        num(m.fat)
    )
}

/// Whole numbers print without decimals, everything else with one.
fn num(v: f64) -> String {
    let v = round_to(v, 1);
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

fn list(items: &[String]) -> String {
    let items: Vec<&str> = items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn profile_section(profile: &UserProfile) -> String {
    let goal = |g: Option<DietGoal>| {
        g.and_then(|g| serde_json::to_value(g).ok())
            .and_then(|v| v.as_str().map(|s| s.replace('_', " ")))
            .unwrap_or_else(|| "not specified".to_string())
    };

    let mut lines = vec![
        format!("- Primary goal: {}", goal(profile.primary_goal)),
        format!("- Secondary goal: {}", goal(profile.secondary_goal)),
        format!(
            "- Dietary preference: {}",
            profile.dietary_preference.as_deref().unwrap_or("none")
        ),
        format!("- ALLERGIES (never include): {}", list(&profile.allergies)),
        format!("- Disliked ingredients (avoid): {}", list(&profile.disliked_ingredients)),
        format!("- Preferred ingredients (favor): {}", list(&profile.preferred_ingredients)),
        format!("- Preferred cuisines: {}", list(&profile.preferred_cuisines)),
        format!("- Disliked cuisines: {}", list(&profile.disliked_cuisines)),
    ];
    if !profile.medical_conditions.is_empty() || !profile.medications.is_empty() {
        lines.push(format!(
            "- Medical conditions (respect dietary implications): {}",
            list(&profile.medical_conditions)
        ));
        lines.push(format!("- Medications: {}", list(&profile.medications)));
    }
    lines.join("\n")
}
