//! Ordered provider fallback: primary first, then each secondary once.
//!
//! A provider is never called twice for one request. The chain stops early on
//! failures whose recovery is `FallBack` and reports every attempt so the caller
//! can record why it fell back.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{info, warn};

use super::{generate, GenerationProvider, GenerationRequest, ProviderError, RawJson, Recovery};

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    Provider(ProviderError),
    /// Parsed as JSON but failed shape validation after repair.
    Malformed(String),
}

impl AttemptFailure {
    pub fn recovery(&self) -> Recovery {
        match self {
            AttemptFailure::Provider(e) => e.recovery(),
            AttemptFailure::Malformed(_) => Recovery::TryNextProvider,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Provider(e) => e.kind(),
            AttemptFailure::Malformed(_) => "malformed_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedAttempt {
    pub provider: &'static str,
    pub failure: AttemptFailure,
}

#[derive(Debug)]
pub struct ChainSuccess<T> {
    pub provider: &'static str,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainExhausted {
    pub attempts: Vec<FailedAttempt>,
}

impl ChainExhausted {
    /// Human-readable summary, e.g. `gemini: timeout; openai: malformed_response`.
    pub fn reason(&self) -> String {
        if self.attempts.is_empty() {
            return "no generation provider configured".to_string();
        }
        self.attempts
            .iter()
            .map(|a| format!("{}: {}", a.provider, a.failure.kind()))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn GenerationProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn GenerationProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Runs the request through each provider until one yields output that `validate` accepts.
    pub async fn generate_validated<T, E, F>(
        &self,
        request: &GenerationRequest<'_>,
        validate: F,
    ) -> Result<ChainSuccess<T>, ChainExhausted>
    where
        F: Fn(&RawJson) -> Result<T, E> + Sync,
        T: Send,
        E: Display,
    {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let name = provider.name();
            let failure = match generate(provider.as_ref(), request).await {
                Ok(raw) => match validate(&raw) {
                    Ok(value) => {
                        info!("{name} produced a valid response");
                        return Ok(ChainSuccess { provider: name, value });
                    }
                    Err(e) => AttemptFailure::Malformed(e.to_string()),
                },
                Err(e) => AttemptFailure::Provider(e),
            };

            warn!("Provider {name} failed ({}): {failure:?}", failure.kind());
            let recovery = failure.recovery();
            attempts.push(FailedAttempt { provider: name, failure });
            if recovery == Recovery::FallBack {
                break;
            }
        }

        Err(ChainExhausted { attempts })
    }
}
