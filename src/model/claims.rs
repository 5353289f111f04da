//! Domain models for claim analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Claim submitted for fact checking
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClaimRequest {
    /// Assertion to evaluate for historical accuracy
    #[serde(default, alias = "claimText")]
    pub claim: String,
}

/// Closed catalog of icons the provider may pick from
///
/// The numeric index is the wire representation (`iconKey`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Icon {
    Scroll,
    Swords,
    Crown,
    Column,
    Ship,
    Globe,
    Book,
    Flag,
    Factory,
    Handshake,
}

impl Icon {
    /// Every icon in index order
    pub const ALL: [Icon; 10] = [
        Icon::Scroll,
        Icon::Swords,
        Icon::Crown,
        Icon::Column,
        Icon::Ship,
        Icon::Globe,
        Icon::Book,
        Icon::Flag,
        Icon::Factory,
        Icon::Handshake,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Look up an icon by its catalog index
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Icon::Scroll => "scroll",
            Icon::Swords => "swords",
            Icon::Crown => "crown",
            Icon::Column => "column",
            Icon::Ship => "ship",
            Icon::Globe => "globe",
            Icon::Book => "book",
            Icon::Flag => "flag",
            Icon::Factory => "factory",
            Icon::Handshake => "handshake",
        }
    }

    /// Topic the icon stands for, shown to the provider when choosing
    pub fn topic(self) -> &'static str {
        match self {
            Icon::Scroll => "general history",
            Icon::Swords => "war and military conflict",
            Icon::Crown => "monarchy, empires and rulers",
            Icon::Column => "ancient civilizations",
            Icon::Ship => "exploration, navigation and trade",
            Icon::Globe => "geography, borders and migration",
            Icon::Book => "religion, culture and science",
            Icon::Flag => "revolutions, independence and nations",
            Icon::Factory => "industry and economics",
            Icon::Handshake => "treaties and diplomacy",
        }
    }
}

impl From<Icon> for u8 {
    fn from(icon: Icon) -> Self {
        icon.index()
    }
}

impl TryFrom<u8> for Icon {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Icon::from_index(i64::from(value)).ok_or_else(|| format!("unknown icon index {}", value))
    }
}

/// Validated outcome of a claim analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Confidence (0-100) that the claim is historically accurate
    pub fact_score: u8,
    /// Justification referencing evidence, at most 200 words
    pub explanation: String,
    /// Index into the icon catalog
    #[serde(rename = "iconKey")]
    #[schema(value_type = u8)]
    pub icon: Icon,
    /// Citation URL (format-checked only)
    pub source_url: String,
    /// Whether the claim is a historical claim the service covers
    pub relevant: bool,
}

/// Token and cost accounting for provider calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl UsageMetrics {
    pub fn new(total_tokens: u64, total_cost: f64) -> Self {
        Self {
            total_tokens,
            total_cost,
        }
    }

    /// Sum of two usage reports (used when a call is retried)
    pub fn combine(self, other: UsageMetrics) -> Self {
        Self {
            total_tokens: self.total_tokens.saturating_add(other.total_tokens),
            total_cost: self.total_cost + other.total_cost,
        }
    }
}

/// Persisted record of one successful analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub id: Uuid,
    pub user_id: String,
    pub claim_text: String,
    pub result: AnalysisResult,
    pub usage: UsageMetrics,
    pub created_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(
        user_id: impl Into<String>,
        claim_text: impl Into<String>,
        result: AnalysisResult,
        usage: UsageMetrics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            claim_text: claim_text.into(),
            result,
            usage,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_index_roundtrip_over_catalog() {
        for (i, icon) in Icon::ALL.iter().enumerate() {
            assert_eq!(icon.index() as usize, i);
            assert_eq!(Icon::from_index(i as i64), Some(*icon));
        }
        assert_eq!(Icon::from_index(-1), None);
        assert_eq!(Icon::from_index(Icon::ALL.len() as i64), None);
    }

    #[test]
    fn test_analysis_result_serializes_camel_case() {
        let result = AnalysisResult {
            fact_score: 20,
            explanation: "The Western Roman Empire fell in 476 AD.".to_string(),
            icon: Icon::Column,
            source_url: "https://example.org/rome".to_string(),
            relevant: true,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["factScore"], 20);
        assert_eq!(json["iconKey"], 3);
        assert_eq!(json["sourceUrl"], "https://example.org/rome");
        assert_eq!(json["relevant"], true);
    }

    #[test]
    fn test_claim_request_accepts_alias() {
        let req: ClaimRequest = serde_json::from_str(r#"{"claimText": "Rome fell"}"#).unwrap();
        assert_eq!(req.claim, "Rome fell");

        let req: ClaimRequest = serde_json::from_str("{}").unwrap();
        assert!(req.claim.is_empty());
    }

    #[test]
    fn test_usage_combine() {
        let usage = UsageMetrics::new(100, 0.002).combine(UsageMetrics::new(50, 0.001));
        assert_eq!(usage.total_tokens, 150);
        assert!((usage.total_cost - 0.003).abs() < 1e-12);

        let usage = UsageMetrics::new(u64::MAX, 0.0).combine(UsageMetrics::new(1, 0.0));
        assert_eq!(usage.total_tokens, u64::MAX);
    }
}
