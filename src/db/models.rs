//! Database models for analyzed claims

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbError;
use crate::model::ClaimRecord;

/// Column values of a `claims` row
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRow {
    pub id: Uuid,
    pub user_id: String,
    pub claim_text: String,
    pub fact_score: i16,
    pub explanation: String,
    pub icon_key: i16,
    pub source_url: String,
    pub relevant: bool,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&ClaimRecord> for ClaimRow {
    type Error = DbError;

    fn try_from(record: &ClaimRecord) -> Result<Self, Self::Error> {
        let total_tokens =
            i64::try_from(record.usage.total_tokens).map_err(|_| DbError::OutOfRange {
                column: "total_tokens",
                value: record.usage.total_tokens.to_string(),
            })?;

        Ok(Self {
            id: record.id,
            user_id: record.user_id.clone(),
            claim_text: record.claim_text.clone(),
            fact_score: i16::from(record.result.fact_score),
            explanation: record.result.explanation.clone(),
            icon_key: i16::from(record.result.icon.index()),
            source_url: record.result.source_url.clone(),
            relevant: record.result.relevant,
            total_tokens,
            total_cost: record.usage.total_cost,
            created_at: record.created_at,
        })
    }
}
