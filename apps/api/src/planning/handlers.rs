use axum::{
    extract::{Path, State},
    Json,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::plan::{DailyMealPlan, MacroTotals, Meal, WeeklyMealPlan};
use crate::models::profile::UserProfile;
use crate::nutrition::distribution::{allocate_meal_targets, MealDistribution, MealTarget};
use crate::nutrition::targets::{calculate_breakdown, DailyTargets, TargetBreakdown};
use crate::planning::fallback::{compose_dish, Candidate, FallbackResult, SearchConfig};
use crate::planning::generator::{
    adjust_meals_batch, adjust_single_meal, generate_weekly_plan, validate_ingredients, validate_target,
    MealAdjustmentInput, MealAdjustmentOutcome, WeeklyPlanOutcome,
};
use crate::planning::merge::{check_slot, merge_day_into_plan, merge_meal_into_plan};
use crate::state::AppState;

/// Upper bound on caller-supplied search iterations for `/meals/compose`.
const MAX_COMPOSE_ITERATIONS: usize = 20_000;

/// Relative gap between `calories` and 4/4/9 macro calories that triggers a warning.
const MACRO_CALORIE_DRIFT: f64 = 0.05;

// ────────────────────────────────────────────────────────────────────────────
// Targets
// ────────────────────────────────────────────────────────────────────────────

/// Everything needed to derive per-slot targets. Shared by `/targets` and `/plans/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TargetInputs {
    pub profile: UserProfile,
    /// Replaces the calculated daily targets when present.
    pub custom_targets: Option<DailyTargets>,
    /// Custom meal distribution; the default six-slot table when absent or empty.
    pub distributions: Option<Vec<MealDistribution>>,
}

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub daily_targets: Option<DailyTargets>,
    pub breakdown: Option<TargetBreakdown>,
    pub missing_fields: Vec<&'static str>,
    pub meal_targets: Vec<MealTarget>,
}

fn resolve_targets(inputs: &TargetInputs) -> Result<TargetsResponse, AppError> {
    let (breakdown, missing_fields) = match calculate_breakdown(&inputs.profile) {
        Ok(b) => (Some(b), Vec::new()),
        Err(unavailable) => (None, unavailable.missing_fields),
    };

    let daily_targets = match inputs.custom_targets {
        Some(custom) => {
            if let Some(field) = custom.first_invalid_field() {
                return Err(AppError::invalid_field(
                    format!("custom_targets.{field}"),
                    "must be a finite non-negative number",
                ));
            }
            let implied = custom.macro_calories();
            if custom.calories > 0.0 && (implied - custom.calories).abs() / custom.calories > MACRO_CALORIE_DRIFT {
                warn!(
                    "Custom targets: macros imply {implied:.0} kcal but calories are {:.0}; allocating as given",
                    custom.calories
                );
            }
            Some(custom)
        }
        None => breakdown.map(|b| b.targets),
    };

    let meal_targets = match &daily_targets {
        Some(daily) => allocate_meal_targets(daily, inputs.distributions.as_deref())?,
        None => Vec::new(),
    };

    Ok(TargetsResponse {
        daily_targets,
        breakdown,
        missing_fields,
        meal_targets,
    })
}

/// POST /api/v1/targets
pub async fn handle_targets(Json(inputs): Json<TargetInputs>) -> Result<Json<TargetsResponse>, AppError> {
    Ok(Json(resolve_targets(&inputs)?))
}

// ────────────────────────────────────────────────────────────────────────────
// Weekly plan
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeneratePlanRequest {
    #[serde(flatten)]
    pub targets: TargetInputs,
    /// Pre-computed slot targets; skips target calculation entirely.
    pub meal_targets: Option<Vec<MealTarget>>,
}

/// POST /api/v1/plans/generate
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<GeneratePlanRequest>,
) -> Result<Json<WeeklyPlanOutcome>, AppError> {
    let meal_targets = match req.meal_targets {
        Some(targets) if !targets.is_empty() => targets,
        _ => {
            let resolved = resolve_targets(&req.targets)?;
            if resolved.daily_targets.is_none() {
                return Err(AppError::Validation(format!(
                    "profile is incomplete, missing or implausible: {}",
                    resolved.missing_fields.join(", ")
                )));
            }
            resolved.meal_targets
        }
    };

    let outcome = generate_weekly_plan(
        &state.providers,
        state.config.weekly_plan_timeout,
        &req.targets.profile,
        &meal_targets,
    )
    .await?;

    state.store.upsert(user_id, &outcome.plan).await?;
    info!(
        "Stored weekly plan for {user_id} (fallback: {}, pantry slots: {})",
        outcome.marker.is_fallback, outcome.fallback_slots
    );
    Ok(Json(outcome))
}

async fn load_plan(state: &AppState, user_id: uuid::Uuid) -> Result<WeeklyMealPlan, AppError> {
    state
        .store
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No meal plan has been generated yet".to_string()))
}

/// GET /api/v1/plans/current
pub async fn handle_get_plan(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<WeeklyMealPlan>, AppError> {
    Ok(Json(load_plan(&state, user_id).await?))
}

/// PUT /api/v1/plans/current/days/:day/meals/:meal
pub async fn handle_replace_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((day_index, meal_index)): Path<(usize, usize)>,
    Json(meal): Json<Meal>,
) -> Result<Json<WeeklyMealPlan>, AppError> {
    validate_ingredients(&meal, "meal")?;
    let plan = load_plan(&state, user_id).await?;
    let merged = merge_meal_into_plan(&plan, day_index, meal_index, meal)?;
    state.store.upsert(user_id, &merged).await?;
    Ok(Json(merged))
}

/// PUT /api/v1/plans/current/days/:day
pub async fn handle_replace_day(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(day_index): Path<usize>,
    Json(day): Json<DailyMealPlan>,
) -> Result<Json<WeeklyMealPlan>, AppError> {
    for (i, meal) in day.meals.iter().enumerate() {
        validate_ingredients(meal, &format!("meals[{i}]"))?;
    }
    let plan = load_plan(&state, user_id).await?;
    let merged = merge_day_into_plan(&plan, day_index, day)?;
    state.store.upsert(user_id, &merged).await?;
    Ok(Json(merged))
}

// ────────────────────────────────────────────────────────────────────────────
// Meal adjustment
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdjustMealRequest {
    pub meal: Meal,
    pub target: MacroTotals,
    #[serde(default)]
    pub profile: UserProfile,
    /// With `meal_index`, merges the result into the stored plan at that slot.
    pub day_index: Option<usize>,
    pub meal_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AdjustMealResponse {
    #[serde(flatten)]
    pub outcome: MealAdjustmentOutcome,
    /// The stored plan after the merge, when a slot was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<WeeklyMealPlan>,
}

/// POST /api/v1/meals/adjust
pub async fn handle_adjust_meal(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Json(req): Json<AdjustMealRequest>,
) -> Result<Json<AdjustMealResponse>, AppError> {
    let slot = match (req.day_index, req.meal_index) {
        (Some(day), Some(meal)) => {
            let CurrentUser(user_id) = user.ok_or(AppError::Unauthorized)?;
            let plan = load_plan(&state, user_id).await?;
            check_slot(&plan, day, meal)?;
            Some((user_id, plan, day, meal))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "day_index and meal_index must be given together".to_string(),
            ))
        }
    };

    let outcome = adjust_single_meal(
        &state.providers,
        state.config.meal_adjust_timeout,
        &req.meal,
        &req.target,
        &req.profile,
    )
    .await?;

    let plan = match slot {
        Some((user_id, plan, day, meal)) => {
            let merged = merge_meal_into_plan(&plan, day, meal, outcome.meal.clone())?;
            state.store.upsert(user_id, &merged).await?;
            Some(merged)
        }
        None => None,
    };

    Ok(Json(AdjustMealResponse { outcome, plan }))
}

#[derive(Debug, Deserialize)]
pub struct AdjustBatchRequest {
    pub meals: Vec<MealAdjustmentInput>,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct AdjustBatchResponse {
    pub results: Vec<MealAdjustmentOutcome>,
}

/// POST /api/v1/meals/adjust-batch
pub async fn handle_adjust_batch(
    State(state): State<AppState>,
    Json(req): Json<AdjustBatchRequest>,
) -> Result<Json<AdjustBatchResponse>, AppError> {
    let results = adjust_meals_batch(
        &state.providers,
        state.config.meal_adjust_timeout,
        &req.meals,
        &req.profile,
    )
    .await?;
    Ok(Json(AdjustBatchResponse { results }))
}

// ────────────────────────────────────────────────────────────────────────────
// Dish composition
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    pub meal_name: String,
    #[serde(default)]
    pub dish_name: String,
    pub candidates: Vec<Candidate>,
    pub target: MacroTotals,
    /// Fixes the search for reproducible results.
    pub seed: Option<u64>,
    pub iterations: Option<usize>,
}

fn validate_candidates(candidates: &[Candidate]) -> Result<(), AppError> {
    if candidates.is_empty() {
        return Err(AppError::invalid_field("candidates", "must not be empty"));
    }
    for (i, c) in candidates.iter().enumerate() {
        let density = MacroTotals {
            calories: c.density.calories_per_100g,
            protein: c.density.protein_per_100g,
            carbs: c.density.carbs_per_100g,
            fat: c.density.fat_per_100g,
        };
        validate_target(&density, &format!("candidates[{i}]"))?;
        if !c.serving_g.is_finite() || c.serving_g <= 0.0 {
            return Err(AppError::invalid_field(
                format!("candidates[{i}].serving_g"),
                "must be a finite positive number",
            ));
        }
    }
    Ok(())
}

/// POST /api/v1/meals/compose
pub async fn handle_compose(Json(req): Json<ComposeRequest>) -> Result<Json<FallbackResult>, AppError> {
    validate_candidates(&req.candidates)?;
    validate_target(&req.target, "target")?;

    let config = SearchConfig {
        iterations: req.iterations.unwrap_or(SearchConfig::default().iterations).min(MAX_COMPOSE_ITERATIONS),
        ..SearchConfig::default()
    };
    let mut rng = match req.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    Ok(Json(compose_dish(
        &req.meal_name,
        &req.dish_name,
        &req.candidates,
        &req.target,
        &config,
        &mut rng,
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::USER_ID_HEADER;
    use crate::config::Config;
    use crate::llm_client::chain::testing::{chain_of, ScriptedProvider};
    use crate::llm_client::chain::ProviderChain;
    use crate::planning::store::memory::MemoryPlanStore;
    use crate::planning::store::PlanStore;
    use crate::routes::build_router;
    use crate::state::AppState;

    fn config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            gemini_api_key: None,
            openai_api_key: None,
            weekly_plan_timeout: Duration::from_secs(180),
            meal_adjust_timeout: Duration::from_secs(60),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }

    fn app(providers: ProviderChain) -> (Router, Arc<MemoryPlanStore>) {
        let store = Arc::new(MemoryPlanStore::default());
        let state = AppState {
            store: store.clone(),
            providers: Arc::new(providers),
            config: config(),
        };
        (build_router(state), store)
    }

    async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn complete_profile() -> Value {
        json!({
            "age": 30,
            "sex": "male",
            "height_cm": 180,
            "current_weight_kg": 80,
            "activity_level": "moderately_active",
            "primary_goal": "maintenance"
        })
    }

    fn two_slot_targets() -> Value {
        json!([
            {"mealName": "Breakfast", "calories": 600, "protein": 40, "carbs": 60, "fat": 20},
            {"mealName": "Dinner", "calories": 800, "protein": 55, "carbs": 80, "fat": 25}
        ])
    }

    #[tokio::test]
    async fn test_targets_reports_missing_fields_without_failing() {
        let (app, _) = app(ProviderChain::default());
        let (status, body) = send(&app, "POST", "/api/v1/targets", None, json!({"profile": {"age": 30}})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["daily_targets"].is_null());
        assert!(body["missing_fields"].as_array().unwrap().contains(&json!("sex")));
        assert_eq!(body["meal_targets"], json!([]));
    }

    #[tokio::test]
    async fn test_targets_reports_negative_age_as_missing() {
        let (app, _) = app(ProviderChain::default());
        let profile = json!({
            "age": -5, "sex": "male", "height_cm": 180, "current_weight_kg": 80,
            "activity_level": "moderately_active", "primary_goal": "fat_loss"
        });
        let (status, body) = send(&app, "POST", "/api/v1/targets", None, json!({"profile": profile})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["daily_targets"].is_null());
        assert_eq!(body["missing_fields"], json!(["age"]));
    }

    #[tokio::test]
    async fn test_targets_with_custom_override_allocates_slots() {
        let (app, _) = app(ProviderChain::default());
        let request = json!({
            "custom_targets": {"calories": 2000, "protein_g": 150, "carbs_g": 200, "fat_g": 67}
        });
        let (status, body) = send(&app, "POST", "/api/v1/targets", None, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["daily_targets"]["calories"], 2000.0);
        assert_eq!(body["meal_targets"].as_array().unwrap().len(), 6);
        assert_eq!(body["meal_targets"][0]["calories"], 500.0);
    }

    #[tokio::test]
    async fn test_negative_custom_target_is_rejected() {
        let (app, _) = app(ProviderChain::default());
        let request = json!({
            "custom_targets": {"calories": 2000, "protein_g": -1, "carbs_g": 200, "fat_g": 67}
        });
        let (status, body) = send(&app, "POST", "/api/v1/targets", None, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("custom_targets.protein_g"));
    }

    #[tokio::test]
    async fn test_plan_routes_require_user() {
        let (app, _) = app(ProviderChain::default());
        let (status, body) = send(&app, "GET", "/api/v1/plans/current", None, Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_missing_plan_is_not_found() {
        let (app, _) = app(ProviderChain::default());
        let (status, _) = send(&app, "GET", "/api/v1/plans/current", Some(Uuid::new_v4()), Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_with_no_provider_stores_fallback_week() {
        let (app, store) = app(ProviderChain::default());
        let user = Uuid::new_v4();
        let request = json!({"meal_targets": two_slot_targets()});
        let (status, body) = send(&app, "POST", "/api/v1/plans/generate", Some(user), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isFallback"], true);
        assert_eq!(body["fallbackReason"], "no generation provider configured");
        assert_eq!(body["plan"]["days"].as_array().unwrap().len(), 7);

        let stored = store.get(user).await.unwrap().unwrap();
        assert_eq!(stored.days[0].meals.len(), 2);
        assert_eq!(stored.days[0].meals[0].name, "Breakfast");
    }

    #[tokio::test]
    async fn test_generate_from_profile_uses_default_slots() {
        let (app, store) = app(ProviderChain::default());
        let user = Uuid::new_v4();
        let request = json!({"profile": complete_profile()});
        let (status, _) = send(&app, "POST", "/api/v1/plans/generate", Some(user), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.get(user).await.unwrap().unwrap().days[3].meals.len(), 6);
    }

    #[tokio::test]
    async fn test_generate_with_incomplete_profile_is_rejected() {
        let (app, _) = app(ProviderChain::default());
        let request = json!({"profile": {"age": 30}});
        let (status, body) = send(&app, "POST", "/api/v1/plans/generate", Some(Uuid::new_v4()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("height_cm"));
    }

    #[tokio::test]
    async fn test_replace_meal_merges_and_recomputes() {
        let (app, _) = app(ProviderChain::default());
        let user = Uuid::new_v4();
        send(&app, "POST", "/api/v1/plans/generate", Some(user), json!({"meal_targets": two_slot_targets()})).await;

        let meal = json!({
            "name": "Dinner",
            "custom_name": "Salmon bowl",
            "ingredients": [
                {"name": "salmon", "quantity": 130, "unit": "g", "calories": 270, "protein": 26.5, "carbs": 0, "fat": 17.4}
            ]
        });
        let (status, body) = send(&app, "PUT", "/api/v1/plans/current/days/2/meals/1", Some(user), meal).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"][2]["meals"][1]["custom_name"], "Salmon bowl");
        assert_eq!(body["days"][2]["meals"][1]["total_calories"], 270.0);

        let (status, _) = send(
            &app,
            "PUT",
            "/api/v1/plans/current/days/7/meals/0",
            Some(user),
            json!({"name": "Dinner", "ingredients": []}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_replace_day_swaps_whole_day() {
        let (app, _) = app(ProviderChain::default());
        let user = Uuid::new_v4();
        send(&app, "POST", "/api/v1/plans/generate", Some(user), json!({"meal_targets": two_slot_targets()})).await;

        let day = json!({"day_of_week": "Friday", "meals": [{"name": "Lunch", "ingredients": [
            {"name": "lentil soup", "quantity": 400, "unit": "ml", "calories": 360, "protein": 24, "carbs": 52, "fat": 6}
        ]}]});
        let (status, body) = send(&app, "PUT", "/api/v1/plans/current/days/4", Some(user), day).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"][4]["meals"].as_array().unwrap().len(), 1);
        assert_eq!(body["days"][4]["daily_totals"]["total_calories"], 360.0);
    }

    fn adjust_body() -> Value {
        json!({
            "meal": {"name": "Breakfast", "custom_name": "Eggs on toast", "ingredients": [
                {"name": "eggs", "quantity": 100, "unit": "g", "calories": 143, "protein": 12.6, "carbs": 0.7, "fat": 9.5},
                {"name": "toast", "quantity": 50, "unit": "g", "calories": 132, "protein": 4.5, "carbs": 24.5, "fat": 1.6}
            ]},
            "target": {"calories": 550, "protein": 34, "carbs": 50, "fat": 22}
        })
    }

    #[tokio::test]
    async fn test_adjust_without_slot_falls_back_and_stores_nothing() {
        let (app, store) = app(chain_of(&[ScriptedProvider::replying("gemini", "not json")]));
        let user = Uuid::new_v4();
        let (status, body) = send(&app, "POST", "/api/v1/meals/adjust", Some(user), adjust_body()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isFallback"], true);
        assert_eq!(body["meal"]["total_calories"], 550.0);
        assert!(body.get("plan").is_none());
        assert!(store.get(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_adjust_into_slot_merges_and_upserts() {
        let (app, store) = app(ProviderChain::default());
        let user = Uuid::new_v4();
        send(&app, "POST", "/api/v1/plans/generate", Some(user), json!({"meal_targets": two_slot_targets()})).await;

        let mut request = adjust_body();
        request["day_index"] = json!(1);
        request["meal_index"] = json!(0);
        let (status, body) = send(&app, "POST", "/api/v1/meals/adjust", Some(user), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"]["days"][1]["meals"][0]["custom_name"], "Eggs on toast");

        let stored = store.get(user).await.unwrap().unwrap();
        assert_eq!(stored.days[1].meals[0].custom_name, "Eggs on toast");
        assert_eq!(stored.days[1].meals[0].total_calories, 550.0);
    }

    #[tokio::test]
    async fn test_adjust_with_half_a_slot_is_rejected() {
        let (app, _) = app(ProviderChain::default());
        let mut request = adjust_body();
        request["day_index"] = json!(1);
        let (status, _) = send(&app, "POST", "/api/v1/meals/adjust", Some(Uuid::new_v4()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_adjust_batch_over_cap_is_rejected() {
        let (app, _) = app(ProviderChain::default());
        let item = adjust_body();
        let request = json!({"meals": vec![item; 11]});
        let (status, body) = send(&app, "POST", "/api/v1/meals/adjust-batch", None, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("at most 10"));
    }

    #[tokio::test]
    async fn test_compose_is_reproducible_with_seed() {
        let (app, _) = app(ProviderChain::default());
        let request = json!({
            "meal_name": "Lunch",
            "dish_name": "Chicken rice bowl",
            "candidates": [
                {"name": "chicken breast", "calories_per_100g": 165, "protein_per_100g": 31, "carbs_per_100g": 0, "fat_per_100g": 3.6, "serving_g": 150},
                {"name": "rice", "calories_per_100g": 130, "protein_per_100g": 2.7, "carbs_per_100g": 28, "fat_per_100g": 0.3, "serving_g": 180}
            ],
            "target": {"calories": 600, "protein": 50, "carbs": 60, "fat": 8},
            "seed": 42
        });
        let (status, first) = send(&app, "POST", "/api/v1/meals/compose", None, request.clone()).await;
        let (_, second) = send(&app, "POST", "/api/v1/meals/compose", None, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first["meal"]["ingredients"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_compose_rejects_zero_serving() {
        let (app, _) = app(ProviderChain::default());
        let request = json!({
            "meal_name": "Lunch",
            "candidates": [
                {"name": "rice", "calories_per_100g": 130, "protein_per_100g": 2.7, "carbs_per_100g": 28, "fat_per_100g": 0.3, "serving_g": 0}
            ],
            "target": {"calories": 600, "protein": 50, "carbs": 60, "fat": 8}
        });
        let (status, body) = send(&app, "POST", "/api/v1/meals/compose", None, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().contains("candidates[0].serving_g"));
    }
}
