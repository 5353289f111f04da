//! Repository for analyzed claim records

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::ClaimRow;
use super::{ClaimStore, DbError};
use crate::model::ClaimRecord;

/// PostgreSQL-backed claim store
#[derive(Clone)]
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimStore for ClaimRepository {
    async fn insert(&self, record: &ClaimRecord) -> Result<Uuid, DbError> {
        let row = ClaimRow::try_from(record)?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                id, user_id, claim_text,
                fact_score, explanation, icon_key, source_url, relevant,
                total_tokens, total_cost, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id)
        .bind(&row.user_id)
        .bind(&row.claim_text)
        .bind(row.fact_score)
        .bind(&row.explanation)
        .bind(row.icon_key)
        .bind(&row.source_url)
        .bind(row.relevant)
        .bind(row.total_tokens)
        .bind(row.total_cost)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %row.id, user = %row.user_id, "Inserted claim record");
        Ok(row.id)
    }
}
