//! Claim analysis service
//!
//! Sends a claim to the text-generation provider under the analysis schema,
//! records usage, and validates the response into an [`AnalysisResult`].
//! Persistence is left to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::model::{AnalysisConfig, AnalysisResult, UsageMetrics};
use crate::service::llm::{GenerationRequest, ProviderError, TextGenerator};

pub mod error;
pub mod prompts;
pub mod schema;

pub use error::AnalysisError;

use prompts::build_analysis_prompt;

/// Successful analysis with the usage it incurred
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimAnalysis {
    pub result: AnalysisResult,
    pub usage: UsageMetrics,
}

/// Service for fact-checking historical claims
pub struct ClaimAnalysisService {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f32,
    timeout: Duration,
    strict_retry: bool,
}

impl ClaimAnalysisService {
    /// Create a new analysis service on top of a provider
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AnalysisConfig) -> Self {
        tracing::info!(
            model = %config.model,
            temperature = config.temperature,
            timeout_secs = config.timeout_secs,
            strict_retry = config.strict_retry,
            "Claim analysis service initialized"
        );

        Self {
            generator,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
            strict_retry: config.strict_retry,
        }
    }

    /// Override the provider call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Analyze a claim
    ///
    /// Every call reaches the provider; results are never cached. Dropping the
    /// returned future abandons the provider call.
    pub async fn analyze(&self, claim_text: &str) -> Result<ClaimAnalysis, AnalysisError> {
        self.analyze_with_cancellation(claim_text, &CancellationToken::new()).await
    }

    /// Analyze a claim, giving up as soon as `cancel` fires
    ///
    /// Usage billed by an attempt that completed before cancellation is kept
    /// on the returned error.
    pub async fn analyze_with_cancellation(
        &self,
        claim_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ClaimAnalysis, AnalysisError> {
        let claim = claim_text.trim();
        if claim.is_empty() {
            return Err(AnalysisError::EmptyClaim);
        }

        match self.attempt(claim, false, cancel).await {
            Err(AnalysisError::MalformedProviderOutput { usage, .. }) if self.strict_retry => {
                tracing::info!(
                    model = %self.model,
                    "Retrying claim analysis with strict output instructions"
                );
                self.attempt(claim, true, cancel)
                    .await
                    .map(|analysis| ClaimAnalysis {
                        usage: usage.combine(analysis.usage),
                        ..analysis
                    })
                    .map_err(|e| e.with_prior_usage(usage))
            }
            other => other,
        }
    }

    async fn attempt(
        &self,
        claim: &str,
        strict: bool,
        cancel: &CancellationToken,
    ) -> Result<ClaimAnalysis, AnalysisError> {
        let start_time = Instant::now();

        let request = GenerationRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            prompt: build_analysis_prompt(claim, strict),
        };
        let prompt_length = request.prompt.len();

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt_length,
            strict = strict,
            "Initiating provider call for claim analysis"
        );

        let call = tokio::time::timeout(self.timeout, self.generator.generate(&request));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(model = %self.model, "Claim analysis cancelled by caller");
                return Err(AnalysisError::Cancelled { usage: None });
            }
            outcome = call => match outcome {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout(self.timeout)),
            },
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = prompt_length,
                    error = %e,
                    "Provider call for claim analysis failed"
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            prompt_length = prompt_length,
            total_tokens = response.usage.total_tokens,
            total_cost = response.usage.total_cost,
            "Provider call for claim analysis completed"
        );

        match schema::parse_analysis(&response.text) {
            Ok(result) => Ok(ClaimAnalysis {
                result,
                usage: response.usage,
            }),
            Err(violation) => {
                tracing::warn!(
                    model = %self.model,
                    reason = %violation,
                    raw = %response.text,
                    "Provider output failed schema validation"
                );
                Err(AnalysisError::MalformedProviderOutput {
                    raw: response.text,
                    usage: response.usage,
                    reason: violation.to_string(),
                })
            }
        }
    }
}
