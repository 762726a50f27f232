/// LLM Client: the single point of entry for all generative-text calls in NutriPlan.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// All LLM interactions MUST go through a `GenerationProvider` held by the `ProviderChain`.
///
/// Every failure is classified here into a `ProviderError`; callers decide what to do
/// from `ProviderError::recovery()`, never from error message text.
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

pub mod chain;
pub mod gemini;
pub mod openai;
pub mod prompts;

/// Bounded backoff on HTTP 429 before giving up on a provider.
const MAX_RATE_LIMIT_RETRIES: u32 = 2;
const RATE_LIMIT_BASE_DELAY_MS: u64 = 1000;
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_PREVIEW: usize = 300;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("permission denied (status {status}): {message}")]
    Forbidden { status: u16, message: String },

    #[error("request rejected (status {status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("response was not valid JSON: {0}")]
    InvalidJson(String),

    #[error("provider returned empty content")]
    EmptyContent,
}

/// What the orchestrator should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Move on to the next configured provider; never retry the same one.
    TryNextProvider,
    /// Stop calling providers and use the deterministic fallback.
    FallBack,
}

impl ProviderError {
    pub fn recovery(&self) -> Recovery {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::Server { .. }
            | ProviderError::Forbidden { .. }
            | ProviderError::InvalidJson(_)
            | ProviderError::EmptyContent => Recovery::TryNextProvider,
            // 429 backoff is already exhausted inside the adapter
            ProviderError::RateLimited { .. } | ProviderError::BadRequest { .. } => Recovery::FallBack,
        }
    }

    /// Short stable label for logs and fallback reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Forbidden { .. } => "forbidden",
            ProviderError::BadRequest { .. } => "bad_request",
            ProviderError::Server { .. } => "server_error",
            ProviderError::InvalidJson(_) => "invalid_json",
            ProviderError::EmptyContent => "empty_content",
        }
    }
}

/// One generation call. The provider is asked for JSON output in its native way.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub timeout: Duration,
    pub max_output_tokens: u32,
}

/// Provider text that parsed as a single JSON document (fences already stripped).
#[derive(Debug, Clone, PartialEq)]
pub struct RawJson(pub String);

impl RawJson {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends the request and returns the model's text output.
    async fn complete(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError>;
}

/// Calls `provider` under the request timeout and checks the output is one JSON document.
/// A timeout is reported exactly like any other unavailable-provider failure.
pub async fn generate(
    provider: &dyn GenerationProvider,
    request: &GenerationRequest<'_>,
) -> Result<RawJson, ProviderError> {
    let started = Instant::now();
    let text = match tokio::time::timeout(request.timeout, provider.complete(request)).await {
        Ok(result) => result?,
        Err(_) => return Err(ProviderError::Timeout(request.timeout)),
    };
    debug!(
        "{} returned {} chars in {}ms",
        provider.name(),
        text.len(),
        started.elapsed().as_millis()
    );
    extract_json(&text)
}

/// Strips code fences and surrounding prose, then verifies the remainder parses.
pub fn extract_json(text: &str) -> Result<RawJson, ProviderError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(ProviderError::EmptyContent);
    }
    let candidate = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(_) => text,
        Err(first) => {
            let inner = outermost_json_span(text).ok_or_else(|| ProviderError::InvalidJson(first.to_string()))?;
            serde_json::from_str::<serde_json::Value>(inner)
                .map_err(|e| ProviderError::InvalidJson(e.to_string()))?;
            inner
        }
    };
    Ok(RawJson(candidate.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// The slice from the first `{`/`[` to the last matching closer, if any.
fn outermost_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Maps a non-success HTTP status to a provider error.
pub fn classify_status(status: u16, body: &str) -> ProviderError {
    let message: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    match status {
        429 => ProviderError::RateLimited {
            retries: MAX_RATE_LIMIT_RETRIES,
        },
        401 | 403 => ProviderError::Forbidden { status, message },
        500..=599 => ProviderError::Server { status, message },
        _ => ProviderError::BadRequest { status, message },
    }
}

fn classify_transport(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Network(format!("request timed out: {e}"))
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Delay before retry number `attempt + 1` after a 429, or `None` once the
/// retry budget is spent. Doubles from the base delay: 1s, 2s.
fn rate_limit_delay(attempt: u32) -> Option<Duration> {
    (attempt < MAX_RATE_LIMIT_RETRIES)
        .then(|| Duration::from_millis(RATE_LIMIT_BASE_DELAY_MS << attempt))
}

/// Re-runs `call` while it reports `RateLimited`, sleeping per `rate_limit_delay`.
/// Any other outcome is returned as-is.
async fn retry_rate_limited<T, F, Fut>(provider_name: &str, mut call: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Err(ProviderError::RateLimited { .. }) => match rate_limit_delay(attempt) {
                Some(delay) => {
                    warn!(
                        "{provider_name} rate limited (attempt {}/{}), retrying after {}ms",
                        attempt + 1,
                        MAX_RATE_LIMIT_RETRIES + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(ProviderError::RateLimited { retries: attempt }),
            },
            other => return other,
        }
    }
}

/// Sends a request built fresh on each attempt (RequestBuilder is not cloneable).
/// Only HTTP 429 is retried, through `retry_rate_limited`.
pub(crate) async fn send_classified(
    build_request: impl Fn() -> reqwest::RequestBuilder,
    provider_name: &str,
) -> Result<reqwest::Response, ProviderError> {
    let build_request = &build_request;
    retry_rate_limited(provider_name, move || async move {
        let response = build_request()
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{provider_name} API returned {status}");
        Err(classify_status(status.as_u16(), &body))
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Scripted(Result<String, ProviderError>);

    #[async_trait]
    impl GenerationProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, _request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait]
    impl GenerationProvider for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn complete(&self, _request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("{}".to_string())
        }
    }

    fn request() -> GenerationRequest<'static> {
        GenerationRequest {
            system: "sys",
            prompt: "prompt",
            timeout: Duration::from_secs(5),
            max_output_tokens: 512,
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_recovers_from_leading_prose() {
        let raw = extract_json("Here is your plan:\n{\"a\": 1}\nEnjoy!").unwrap();
        assert_eq!(raw.as_str(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_rejects_plain_text() {
        let err = extract_json("not json").unwrap_err();
        assert_eq!(err.kind(), "invalid_json");
        assert_eq!(err.recovery(), Recovery::TryNextProvider);
    }

    #[test]
    fn test_extract_json_empty_is_empty_content() {
        assert_eq!(extract_json("   ").unwrap_err(), ProviderError::EmptyContent);
    }

    #[test]
    fn test_classify_status_table() {
        assert_eq!(classify_status(429, "").kind(), "rate_limited");
        assert_eq!(classify_status(401, "").kind(), "forbidden");
        assert_eq!(classify_status(403, "").kind(), "forbidden");
        assert_eq!(classify_status(400, "").kind(), "bad_request");
        assert_eq!(classify_status(503, "").kind(), "server_error");
    }

    #[test]
    fn test_recovery_decisions() {
        assert_eq!(classify_status(403, "").recovery(), Recovery::TryNextProvider);
        assert_eq!(classify_status(502, "").recovery(), Recovery::TryNextProvider);
        assert_eq!(classify_status(429, "").recovery(), Recovery::FallBack);
        assert_eq!(classify_status(400, "").recovery(), Recovery::FallBack);
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(1)).recovery(),
            Recovery::TryNextProvider
        );
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(1000);
        match classify_status(500, &body) {
            ProviderError::Server { message, .. } => assert_eq!(message.len(), ERROR_BODY_PREVIEW),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_passes_valid_json_through() {
        let provider = Scripted(Ok("```json\n{\"ok\": true}\n```".to_string()));
        let raw = generate(&provider, &request()).await.unwrap();
        assert_eq!(raw.as_str(), "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_generate_propagates_provider_error() {
        let provider = Scripted(Err(ProviderError::Forbidden {
            status: 403,
            message: "bad key".to_string(),
        }));
        let err = generate(&provider, &request()).await.unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out() {
        let err = generate(&Stalled, &request()).await.unwrap_err();
        assert_eq!(err, ProviderError::Timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_rate_limit_delay_schedule_is_bounded() {
        assert_eq!(rate_limit_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(rate_limit_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(rate_limit_delay(2), None);
        assert_eq!(rate_limit_delay(10), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_gives_up_after_two_retries() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result: Result<(), ProviderError> = retry_rate_limited("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify_status(429, "slow down")) }
        })
        .await;
        assert_eq!(result, Err(ProviderError::RateLimited { retries: 2 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_millis(3100), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success_returns_value() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result = retry_rate_limited("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(classify_status(429, ""))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_millis(1100), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ProviderError> = retry_rate_limited("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(classify_status(503, "down")) }
        })
        .await;
        assert_eq!(result.unwrap_err().kind(), "server_error");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
