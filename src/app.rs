//! Application state and service initialization
//!
//! This module centralizes service initialization and dependency injection.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::api::auth::TokenVerifier;
use crate::db::ClaimStore;
use crate::db::repository::ClaimRepository;
use crate::model::Config;
use crate::service::{ClaimAnalysisService, OpenAiGenerator};

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_JWT_SECRET_KEY: &str = "JWT_SECRET_KEY";

/// Application state containing all services and shared resources
pub struct AppState {
    /// Database connection pool
    pub db_pool: PgPool,
    /// Sink for analyzed claims
    pub claim_store: Arc<dyn ClaimStore>,
    /// Claim analysis service
    pub analysis_service: Arc<ClaimAnalysisService>,
    /// Bearer token verification
    pub token_verifier: TokenVerifier,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Credential checks (requires OPENAI_API_KEY and JWT_SECRET_KEY)
    /// 2. Database connection and schema initialization
    /// 3. Service dependency graph construction
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let api_key = required_env(ENV_OPENAI_API_KEY)?;
        let jwt_secret = required_env(ENV_JWT_SECRET_KEY)?;

        let generator = OpenAiGenerator::new(&api_key, &config.provider, config.pricing)
            .map_err(AppError::InvalidConfig)?;

        let db_pool = crate::db::create_pool()
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        crate::db::init_schema(&db_pool)
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        let analysis_service = Arc::new(ClaimAnalysisService::new(
            Arc::new(generator),
            &config.analysis,
        ));

        Ok(Self {
            claim_store: Arc::new(ClaimRepository::new(db_pool.clone())),
            db_pool,
            analysis_service,
            token_verifier: TokenVerifier::new(&jwt_secret),
            shutdown: CancellationToken::new(),
        })
    }
}

fn required_env(name: &'static str) -> Result<String, AppError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::MissingConfig(name))
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Database initialization failed
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
