mod auth;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod nutrition;
mod planning;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::llm_client::chain::ProviderChain;
use crate::llm_client::gemini::GeminiProvider;
use crate::llm_client::openai::OpenAiProvider;
use crate::llm_client::GenerationProvider;
use crate::planning::store::PgPlanStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting NutriPlan API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize generation providers (primary first)
    let providers = build_provider_chain(&config)?;
    if providers.is_empty() {
        warn!("No generation provider configured; every plan will use the deterministic fallback");
    } else {
        info!("Generation providers: {:?}", providers.provider_names());
    }

    // Build app state
    let state = AppState {
        store: Arc::new(PgPlanStore::new(db)),
        providers: Arc::new(providers),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Gemini is primary, OpenAI secondary. Providers without a key are skipped.
fn build_provider_chain(config: &Config) -> Result<ProviderChain> {
    let mut providers: Vec<Arc<dyn GenerationProvider>> = Vec::new();
    if let Some(key) = &config.gemini_api_key {
        providers.push(Arc::new(GeminiProvider::new(key.clone())?));
        info!("Gemini provider initialized (model: {})", llm_client::gemini::MODEL);
    }
    if let Some(key) = &config.openai_api_key {
        providers.push(Arc::new(OpenAiProvider::new(key.clone())?));
        info!("OpenAI provider initialized (model: {})", llm_client::openai::MODEL);
    }
    Ok(ProviderChain::new(providers))
}
