//! Google Gemini `generateContent` adapter. Primary provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_classified, GenerationProvider, GenerationRequest, ProviderError, CONNECT_TIMEOUT};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Hardcoded so plan quality does not drift with deployment config.
pub const MODEL: &str = "gemini-2.0-flash";
const TEMPERATURE: f32 = 0.4;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{GEMINI_API_BASE}/{MODEL}:generateContent");
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: request.system }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: request.prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: TEMPERATURE,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = send_classified(
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body)
            },
            self.name(),
        )
        .await?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidJson(format!("gemini envelope: {e}")))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed.text().ok_or(ProviderError::EmptyContent)
    }
}
