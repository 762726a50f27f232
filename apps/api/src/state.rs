use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::chain::ProviderChain;
use crate::planning::store::PlanStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Weekly plan persistence. `PgPlanStore` in production.
    pub store: Arc<dyn PlanStore>,
    /// Generation providers in fallback order, built once at startup.
    pub providers: Arc<ProviderChain>,
    pub config: Config,
}
