use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Primary generation provider. Skipped when unset.
    pub gemini_api_key: Option<String>,
    /// Secondary generation provider. Skipped when unset.
    pub openai_api_key: Option<String>,
    pub weekly_plan_timeout: Duration,
    pub meal_adjust_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            weekly_plan_timeout: timeout_env("WEEKLY_PLAN_TIMEOUT_SECS", 180)?,
            meal_adjust_timeout: timeout_env("MEAL_ADJUST_TIMEOUT_SECS", 60)?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn timeout_env(key: &str, default_secs: u64) -> Result<Duration> {
    let secs = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        Err(_) => default_secs,
    };
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}
