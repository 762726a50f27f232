// All LLM prompt constants for the Planning module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for single-meal adjustment.
pub const MEAL_ADJUSTMENT_SYSTEM: &str = "You are a registered-dietitian-grade meal optimizer. \
    You adjust ingredient quantities so a meal hits exact macro targets. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Single-meal adjustment prompt template.
/// Replace: {numeric_rules}, {meal_name}, {custom_name}, {ingredients}, {current_totals},
///          {target_calories}, {target_protein}, {target_carbs}, {target_fat}, {profile}
pub const MEAL_ADJUSTMENT_PROMPT_TEMPLATE: &str = r#"Adjust the meal below so its totals match the targets.

MEAL SLOT: {meal_name}
MEAL NAME: {custom_name}

CURRENT INGREDIENTS (quantity, then absolute macros for that quantity):
{ingredients}

CURRENT TOTALS: {current_totals}

TARGETS FOR THIS MEAL:
- calories: {target_calories} kcal
- protein: {target_protein} g
- carbs: {target_carbs} g
- fat: {target_fat} g

USER CONTEXT:
{profile}

HARD RULES:
1. Change ONLY the quantities of the EXISTING ingredients. Do NOT add or remove ingredients.
   The single exception: if an ingredient conflicts with a listed allergy, replace it with the
   closest safe equivalent and say so in "explanation".
2. Keep the meal slot ("name") and display name ("custom_name") unchanged.
3. Recompute calories, protein, carbs and fat of EVERY ingredient for its new quantity.
4. total_calories, total_protein, total_carbs and total_fat MUST equal the sum of the ingredients
   and SHOULD equal the targets above (within 5%).

{numeric_rules}

Return a JSON object with this EXACT schema (no extra fields):
{
  "adjustedMeal": {
    "name": "{meal_name}",
    "custom_name": "{custom_name}",
    "ingredients": [
      {"name": "chicken breast", "quantity": 150, "unit": "g", "calories": 248, "protein": 46.5, "carbs": 0, "fat": 5.4}
    ],
    "total_calories": 0,
    "total_protein": 0,
    "total_carbs": 0,
    "total_fat": 0
  },
  "explanation": "One or two sentences on what was changed and why."
}"#;

/// System prompt for full-week generation.
pub const WEEKLY_PLAN_SYSTEM: &str = "You are an expert meal planner producing complete, \
    realistic 7-day meal plans that hit per-meal macro targets. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Full-week generation prompt template.
/// Replace: {numeric_rules}, {days}, {meal_count}, {slot_targets}, {daily_totals}, {weekly_totals},
///          {profile}
pub const WEEKLY_PLAN_PROMPT_TEMPLATE: &str = r#"Create a 7-day meal plan.

DAYS (in this order): {days}

EVERY DAY HAS EXACTLY {meal_count} MEALS, in this order, with these targets:
{slot_targets}

DAILY TOTAL TARGET: {daily_totals}
WEEKLY TOTAL TARGET (7 days): {weekly_totals}

USER CONTEXT:
{profile}

HARD RULES:
1. Give every meal a descriptive, appetizing title in "meal_title" (e.g. "Greek yogurt parfait with walnuts").
2. Every meal has between 3 and 8 ingredients (snacks may have 2).
3. Every ingredient lists ABSOLUTE calories, protein, carbs and fat for its quantity.
4. The sum of a meal's ingredients must land within 5% of that meal's targets.
5. NEVER use an ingredient the user is allergic to. Avoid disliked ingredients and cuisines.
6. Vary meals across the week; do not repeat the same meal on consecutive days.

{numeric_rules}

STRICT JSON: no markdown fencing, no comments, no trailing commas, numbers unquoted.

Return a JSON object with this EXACT schema (no extra fields):
{
  "weeklyMealPlan": [
    {
      "day": "Monday",
      "meals": [
        {
          "meal_title": "Overnight oats with blueberries",
          "ingredients": [
            {"name": "rolled oats", "quantity": 60, "unit": "g", "calories": 233, "protein": 10.1, "carbs": 39.8, "fat": 4.1}
          ]
        }
      ]
    }
  ]
}"#;
