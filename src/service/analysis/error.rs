//! Error types for claim analysis

use std::time::Duration;

use thiserror::Error;

use crate::model::UsageMetrics;
use crate::service::llm::ProviderError;

/// Error type for claim analysis
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Claim was empty or whitespace; no provider call was made
    #[error("Claim text is empty")]
    EmptyClaim,

    /// Transport failure or timeout reaching the provider
    #[error("Provider unavailable: {reason}")]
    ProviderUnavailable {
        reason: String,
        usage: Option<UsageMetrics>,
    },

    #[error("Provider rate limited the request")]
    ProviderRateLimited {
        retry_after: Option<Duration>,
        usage: Option<UsageMetrics>,
    },

    #[error("Provider quota exceeded")]
    ProviderQuotaExceeded { usage: Option<UsageMetrics> },

    /// Provider answered, but the text did not satisfy the output schema
    #[error("Malformed provider output: {reason}")]
    MalformedProviderOutput {
        raw: String,
        usage: UsageMetrics,
        reason: String,
    },

    /// Caller cancelled before the provider responded
    #[error("Analysis cancelled")]
    Cancelled { usage: Option<UsageMetrics> },

    #[error("Unexpected analysis error: {reason}")]
    Unexpected {
        reason: String,
        usage: Option<UsageMetrics>,
    },
}

impl AnalysisError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::ProviderUnavailable { .. }
                | AnalysisError::ProviderRateLimited { .. }
                | AnalysisError::ProviderQuotaExceeded { .. }
        )
    }

    /// Usage already billed for the failed analysis
    ///
    /// `None` when no provider response was received by any attempt.
    pub fn usage(&self) -> Option<UsageMetrics> {
        match self {
            AnalysisError::EmptyClaim => None,
            AnalysisError::MalformedProviderOutput { usage, .. } => Some(*usage),
            AnalysisError::ProviderUnavailable { usage, .. }
            | AnalysisError::ProviderRateLimited { usage, .. }
            | AnalysisError::ProviderQuotaExceeded { usage }
            | AnalysisError::Cancelled { usage }
            | AnalysisError::Unexpected { usage, .. } => *usage,
        }
    }

    /// Fold usage from an earlier attempt into this error
    pub(crate) fn with_prior_usage(mut self, prior: UsageMetrics) -> Self {
        match &mut self {
            AnalysisError::EmptyClaim => {}
            AnalysisError::MalformedProviderOutput { usage, .. } => {
                *usage = prior.combine(*usage);
            }
            AnalysisError::ProviderUnavailable { usage, .. }
            | AnalysisError::ProviderRateLimited { usage, .. }
            | AnalysisError::ProviderQuotaExceeded { usage }
            | AnalysisError::Cancelled { usage }
            | AnalysisError::Unexpected { usage, .. } => {
                *usage = Some(usage.map_or(prior, |u| prior.combine(u)));
            }
        }
        self
    }
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => {
                AnalysisError::ProviderUnavailable {
                    reason: err.to_string(),
                    usage: None,
                }
            }
            ProviderError::RateLimited { retry_after } => AnalysisError::ProviderRateLimited {
                retry_after,
                usage: None,
            },
            ProviderError::QuotaExceeded => AnalysisError::ProviderQuotaExceeded { usage: None },
            ProviderError::Rejected { .. } | ProviderError::InvalidResponse(_) => {
                AnalysisError::Unexpected {
                    reason: err.to_string(),
                    usage: None,
                }
            }
        }
    }
}
