//! Fakes shared by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::auth::TokenClaims;
use crate::db::{ClaimStore, DbError};
use crate::model::{ClaimRecord, UsageMetrics};
use crate::service::llm::{GenerationRequest, GenerationResponse, ProviderError, TextGenerator};

type ScriptedReply = Result<(String, UsageMetrics), ProviderError>;

/// Provider returning scripted replies in order and recording every request
pub struct FakeGenerator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl FakeGenerator {
    pub fn replying(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::InvalidResponse("no scripted reply".into())));

        reply.map(|(text, usage)| GenerationResponse { text, usage })
    }
}

/// In-memory claim store
#[derive(Default)]
pub struct MemoryClaimStore {
    records: Mutex<Vec<ClaimRecord>>,
}

impl MemoryClaimStore {
    pub fn records(&self) -> Vec<ClaimRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn insert(&self, record: &ClaimRecord) -> Result<Uuid, DbError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record.id)
    }
}

/// Sign an HS256 token expiring `expires_in_secs` from now
pub fn issue_token(
    secret: &str,
    sub: &str,
    expires_in_secs: i64,
    token_type: Option<&str>,
) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        sub: sub.to_string(),
        exp: now + expires_in_secs,
        iat: Some(now),
        token_type: token_type.map(str::to_string),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Provider output with every schema field filled in
pub fn analysis_json(fact_score: i64, icon_key: i64, source_url: &str, relevant: bool) -> String {
    serde_json::json!({
        "factScore": fact_score,
        "explanation": "The Western Roman Empire fell in 476 AD; 1453 is the fall of Constantinople.",
        "iconKey": icon_key,
        "sourceUrl": source_url,
        "relevant": relevant
    })
    .to_string()
}
