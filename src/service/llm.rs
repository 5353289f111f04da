//! Text-generation provider interface and OpenAI-compatible client
//!
//! The analysis service only depends on [`TextGenerator`]; the HTTP client
//! below is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{PricingConfig, ProviderConfig, UsageMetrics};

/// OpenAI error code reported when the account has run out of credit
const QUOTA_EXCEEDED_CODE: &str = "insufficient_quota";

/// One generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub temperature: f32,
    pub prompt: String,
}

/// Raw provider output plus its usage metadata
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: UsageMetrics,
}

/// Failures reaching or using the provider
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("Provider transport failure: {0}")]
    Transport(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider rate limit reached")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Provider quota exceeded")]
    QuotaExceeded,

    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// A text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
    -> Result<GenerationResponse, ProviderError>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Chat-completions client for OpenAI and compatible endpoints
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    pricing: PricingConfig,
}

impl OpenAiGenerator {
    /// Create a new client with the provided API key
    pub fn new(
        api_key: &str,
        provider: &ProviderConfig,
        pricing: PricingConfig,
    ) -> Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("API key is empty".to_string());
        }

        Url::parse(&provider.base_url)
            .map_err(|e| format!("Invalid provider base URL '{}': {}", provider.base_url, e))?;

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            pricing,
        })
    }

    fn usage_for(&self, model: &str, usage: Option<TokenUsage>) -> UsageMetrics {
        let Some(usage) = usage else {
            tracing::warn!(model = %model, "Provider response carried no usage metadata");
            return UsageMetrics::default();
        };

        let total_tokens = if usage.total_tokens > 0 {
            usage.total_tokens
        } else {
            usage.prompt_tokens.saturating_add(usage.completion_tokens)
        };

        let total_cost = match self.pricing.price_for(model) {
            Some(price) => price.cost(usage.prompt_tokens, usage.completion_tokens),
            None => {
                tracing::debug!(
                    model = %model,
                    "No price configured for model, reporting zero cost"
                );
                0.0
            }
        };

        UsageMetrics::new(total_tokens, total_cost)
    }

    /// Turn a successful chat-completions body into a [`GenerationResponse`]
    ///
    /// Usage is read before the message so a billed call with no usable
    /// content still reports it; the empty text then fails validation upstream.
    fn completion_from_body(
        &self,
        model: &str,
        body: &str,
    ) -> Result<GenerationResponse, ProviderError> {
        let completion: ChatCompletionResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let usage = self.usage_for(model, completion.usage);

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| {
                tracing::warn!(
                    model = %model,
                    total_tokens = usage.total_tokens,
                    "Provider response carried no message content"
                );
                String::new()
            });

        Ok(GenerationResponse { text, usage })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            temperature: request.temperature,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, retry_after, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        self.completion_from_body(&request.model, &body)
    }
}

/// Read a `Retry-After` header given in whole seconds
fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success provider response onto [`ProviderError`]
fn classify_failure(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> ProviderError {
    let error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    if status == StatusCode::TOO_MANY_REQUESTS {
        let quota = error.as_ref().is_some_and(|e| {
            e.code.as_deref() == Some(QUOTA_EXCEEDED_CODE)
                || e.kind.as_deref() == Some(QUOTA_EXCEEDED_CODE)
        });
        return if quota {
            ProviderError::QuotaExceeded
        } else {
            ProviderError::RateLimited { retry_after }
        };
    }

    if status.is_server_error() {
        return ProviderError::Transport(format!("Provider returned {}", status));
    }

    let message = error
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    ProviderError::Rejected {
        status: status.as_u16(),
        message,
    }
}
