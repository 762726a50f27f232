//! OpenAI chat-completions adapter. Secondary provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_classified, GenerationProvider, GenerationRequest, ProviderError, CONNECT_TIMEOUT};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.4;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn text(self) -> Option<String> {
        let content = self.choices.into_iter().next()?.message.content?;
        (!content.trim().is_empty()).then_some(content)
    }
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &GenerationRequest<'_>) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: TEMPERATURE,
            max_tokens: request.max_output_tokens,
        };

        let response = send_classified(
            || {
                self.client
                    .post(OPENAI_API_URL)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            },
            self.name(),
        )
        .await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidJson(format!("openai envelope: {e}")))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "OpenAI call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed.text().ok_or(ProviderError::EmptyContent)
    }
}
