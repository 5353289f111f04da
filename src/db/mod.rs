//! Database module for PostgreSQL persistence

pub mod models;
pub mod repository;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

use crate::model::ClaimRecord;

// Environment variable names
const ENV_POSTGRES_HOST: &str = "NEUTRALVIEW_POSTGRES_HOST";
const ENV_POSTGRES_PORT: &str = "NEUTRALVIEW_POSTGRES_PORT";
const ENV_POSTGRES_USER: &str = "NEUTRALVIEW_POSTGRES_USER";
const ENV_POSTGRES_PASSWORD: &str = "NEUTRALVIEW_POSTGRES_PASSWORD";
const ENV_POSTGRES_DB: &str = "NEUTRALVIEW_POSTGRES_DB";

// Default values
const DEFAULT_POSTGRES_HOST: &str = "127.0.0.1";
const DEFAULT_POSTGRES_PORT: &str = "5432";
const DEFAULT_POSTGRES_USER: &str = "neutralview";
const DEFAULT_POSTGRES_PASSWORD: &str = "neutralview";
const DEFAULT_POSTGRES_DB: &str = "neutralview";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: String },
}

/// Append-only sink for analyzed claims
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Persist one record and return its id
    async fn insert(&self, record: &ClaimRecord) -> Result<Uuid, DbError>;
}

/// Create a new database connection pool
pub async fn create_pool() -> Result<PgPool, DbError> {
    let host = env::var(ENV_POSTGRES_HOST).unwrap_or_else(|_| DEFAULT_POSTGRES_HOST.to_string());
    let port = env::var(ENV_POSTGRES_PORT).unwrap_or_else(|_| DEFAULT_POSTGRES_PORT.to_string());
    let user = env::var(ENV_POSTGRES_USER).unwrap_or_else(|_| DEFAULT_POSTGRES_USER.to_string());
    let password =
        env::var(ENV_POSTGRES_PASSWORD).unwrap_or_else(|_| DEFAULT_POSTGRES_PASSWORD.to_string());
    let database = env::var(ENV_POSTGRES_DB).unwrap_or_else(|_| DEFAULT_POSTGRES_DB.to_string());

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, database
    );

    tracing::debug!(host = %host, port = %port, database = %database, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!(host = %host, port = %port, "PostgreSQL connection established");

    Ok(pool)
}

/// Initialize database schema
pub async fn init_schema(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claims (
            id UUID PRIMARY KEY,
            user_id TEXT NOT NULL,
            claim_text TEXT NOT NULL,
            fact_score SMALLINT NOT NULL CHECK (fact_score BETWEEN 0 AND 100),
            explanation TEXT NOT NULL,
            icon_key SMALLINT NOT NULL,
            source_url TEXT NOT NULL,
            relevant BOOLEAN NOT NULL,
            total_tokens BIGINT NOT NULL,
            total_cost DOUBLE PRECISION NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_claims_user_id ON claims(user_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database schema initialized");

    Ok(())
}
