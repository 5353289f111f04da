//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use std::time::Duration;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::UsageMetrics;
use crate::service::AnalysisError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
    /// Provider usage already incurred before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetrics>,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Provider unreachable, throttled or out of quota (502)
    #[error("Analysis temporarily unavailable")]
    ProviderUnavailable {
        retry_after: Option<Duration>,
        usage: Option<UsageMetrics>,
    },

    /// Provider output could not be turned into a result (500)
    #[error("Could not complete analysis")]
    AnalysisFailed { usage: Option<UsageMetrics> },

    /// Analysis abandoned because the server is stopping (503)
    #[error("Service is shutting down")]
    ShuttingDown { usage: Option<UsageMetrics> },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::ProviderUnavailable { .. } => "analysis_unavailable",
            ApiError::AnalysisFailed { .. } => "analysis_failed",
            ApiError::ShuttingDown { .. } => "shutting_down",
            ApiError::Internal(_) => "internal_error",
            ApiError::Database(_) => "database_error",
        }
    }

    /// Provider usage incurred before the failure
    fn usage(&self) -> Option<UsageMetrics> {
        match self {
            ApiError::ProviderUnavailable { usage, .. }
            | ApiError::AnalysisFailed { usage }
            | ApiError::ShuttingDown { usage } => *usage,
            _ => None,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ShuttingDown { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::AnalysisFailed { .. } | ApiError::Internal(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        let mut response = HttpResponse::build(status);
        if let ApiError::ProviderUnavailable {
            retry_after: Some(retry_after),
            ..
        } = self
        {
            response.insert_header((header::RETRY_AFTER, retry_after.as_secs().to_string()));
        }

        response.json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
            usage: self.usage(),
        })
    }
}

// ============================================================================
// From conversions for service errors
// ============================================================================

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::EmptyClaim => ApiError::BadRequest("claim data is required".to_string()),
            AnalysisError::ProviderUnavailable { usage, .. }
            | AnalysisError::ProviderQuotaExceeded { usage } => ApiError::ProviderUnavailable {
                retry_after: None,
                usage,
            },
            AnalysisError::ProviderRateLimited { retry_after, usage } => {
                ApiError::ProviderUnavailable { retry_after, usage }
            }
            AnalysisError::MalformedProviderOutput { usage, .. } => ApiError::AnalysisFailed {
                usage: Some(usage),
            },
            AnalysisError::Unexpected { usage, .. } => ApiError::AnalysisFailed { usage },
            AnalysisError::Cancelled { usage } => ApiError::ShuttingDown { usage },
        }
    }
}

impl From<crate::db::DbError> for ApiError {
    fn from(err: crate::db::DbError) -> Self {
        ApiError::Database(err.to_string())
    }
}
