pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::planning::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Targets
        .route("/api/v1/targets", post(handlers::handle_targets))
        // Weekly plans
        .route("/api/v1/plans/generate", post(handlers::handle_generate_plan))
        .route("/api/v1/plans/current", get(handlers::handle_get_plan))
        .route(
            "/api/v1/plans/current/days/:day",
            put(handlers::handle_replace_day),
        )
        .route(
            "/api/v1/plans/current/days/:day/meals/:meal",
            put(handlers::handle_replace_meal),
        )
        // Meals
        .route("/api/v1/meals/adjust", post(handlers::handle_adjust_meal))
        .route(
            "/api/v1/meals/adjust-batch",
            post(handlers::handle_adjust_batch),
        )
        .route("/api/v1/meals/compose", post(handlers::handle_compose))
        .with_state(state)
}
