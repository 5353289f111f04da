//! REST API endpoint for historical claim analysis

use actix_web::{HttpResponse, post, web};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::AuthenticatedUser;
use super::error::{ApiError, ErrorResponse};
use crate::db::ClaimStore;
use crate::model::{AnalysisResult, ClaimRecord, ClaimRequest, UsageMetrics};
use crate::service::ClaimAnalysisService;

/// Analysis returned to the caller once the record is stored
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub claim_id: Uuid,
    pub claim: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub usage: UsageMetrics,
}

/// Fact-check a historical claim
#[utoipa::path(
    post,
    path = "/v1/claims",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Claim analyzed and stored", body = ClaimResponse),
        (status = 400, description = "Claim text missing or body malformed", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Analysis could not be completed", body = ErrorResponse),
        (status = 502, description = "Provider unavailable", body = ErrorResponse),
        (status = 503, description = "Server shutting down", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "claims"
)]
#[post("/v1/claims")]
pub async fn check_claim(
    user: AuthenticatedUser,
    service: web::Data<ClaimAnalysisService>,
    store: web::Data<dyn ClaimStore>,
    shutdown: web::Data<CancellationToken>,
    body: web::Json<ClaimRequest>,
) -> Result<HttpResponse, ApiError> {
    let claim = body.into_inner().claim.trim().to_string();
    let cancel = shutdown.child_token();

    let analysis = service
        .analyze_with_cancellation(&claim, &cancel)
        .await
        .inspect_err(|e| match e.usage() {
            Some(usage) => tracing::warn!(
                user = %user.user_id,
                total_tokens = usage.total_tokens,
                total_cost = usage.total_cost,
                error = %e,
                "Claim analysis failed after provider usage was incurred"
            ),
            None => tracing::warn!(
                user = %user.user_id,
                retryable = e.is_retryable(),
                error = %e,
                "Claim analysis failed"
            ),
        })?;

    let record = ClaimRecord::new(user.user_id, claim, analysis.result, analysis.usage);
    let claim_id = store.insert(&record).await?;

    tracing::info!(
        claim_id = %claim_id,
        user = %record.user_id,
        fact_score = record.result.fact_score,
        relevant = record.result.relevant,
        total_tokens = record.usage.total_tokens,
        "Claim analyzed"
    );

    Ok(HttpResponse::Ok().json(ClaimResponse {
        claim_id,
        claim: record.claim_text,
        result: record.result,
        usage: record.usage,
    }))
}

/// Configure claim routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(check_claim);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{App, http::StatusCode, http::header, test};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::auth::TokenVerifier;
    use crate::model::AnalysisConfig;
    use crate::service::llm::ProviderError;
    use crate::test_support::{FakeGenerator, MemoryClaimStore, analysis_json, issue_token};

    const SECRET: &str = "claims-test-secret";

    struct Fixture {
        generator: Arc<FakeGenerator>,
        store: Arc<MemoryClaimStore>,
        service: web::Data<ClaimAnalysisService>,
        store_data: web::Data<dyn ClaimStore>,
        verifier: web::Data<TokenVerifier>,
        shutdown: web::Data<CancellationToken>,
    }

    impl Fixture {
        fn new(generator: FakeGenerator) -> Self {
            let generator = Arc::new(generator);
            let store = Arc::new(MemoryClaimStore::default());
            let service = ClaimAnalysisService::new(generator.clone(), &AnalysisConfig::default())
                .with_timeout(Duration::from_millis(200));
            let store_data: Arc<dyn ClaimStore> = store.clone();

            Self {
                generator,
                store,
                service: web::Data::new(service),
                store_data: web::Data::from(store_data),
                verifier: web::Data::new(TokenVerifier::new(SECRET)),
                shutdown: web::Data::new(CancellationToken::new()),
            }
        }
    }

    fn claim_request(body: Value, token: Option<&str>) -> test::TestRequest {
        let req = test::TestRequest::post().uri("/v1/claims").set_json(body);
        match token {
            Some(token) => req.insert_header((header::AUTHORIZATION, format!("Bearer {}", token))),
            None => req,
        }
    }

    macro_rules! init_app {
        ($fixture:expr) => {
            test::init_service(
                App::new()
                    .app_data($fixture.service.clone())
                    .app_data($fixture.store_data.clone())
                    .app_data($fixture.verifier.clone())
                    .app_data($fixture.shutdown.clone())
                    .configure(crate::api::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_analyzed_claim_is_stored_and_returned() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![Ok((
            analysis_json(
                5,
                3,
                "https://en.wikipedia.org/wiki/Fall_of_the_Western_Roman_Empire",
                true,
            ),
            UsageMetrics::new(420, 0.0126),
        ))]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, Some("access"));

        let req = claim_request(
            json!({"claim": "The Roman Empire fell in 1453 AD."}),
            Some(&token),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["factScore"], 5);
        assert_eq!(body["iconKey"], 3);
        assert_eq!(body["relevant"], true);
        assert_eq!(body["usage"]["totalTokens"], 420);

        let records = fixture.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "ada@example.org");
        assert_eq!(records[0].claim_text, "The Roman Empire fell in 1453 AD.");
        assert_eq!(body["claimId"], records[0].id.to_string());
    }

    #[actix_web::test]
    async fn test_claim_text_alias_accepted() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![Ok((
            analysis_json(90, 0, "https://example.org/magna-carta", true),
            UsageMetrics::new(300, 0.01),
        ))]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(
            json!({"claimText": "Magna Carta was sealed in 1215."}),
            Some(&token),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(fixture.store.records().len(), 1);
    }

    #[actix_web::test]
    async fn test_empty_claim_rejected_without_provider_call() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({"claim": "   "}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "bad_request");
        assert_eq!(fixture.generator.calls(), 0);
        assert!(fixture.store.records().is_empty());
    }

    #[actix_web::test]
    async fn test_missing_claim_field_rejected() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fixture.generator.calls(), 0);
    }

    #[actix_web::test]
    async fn test_malformed_body_rejected() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = test::TestRequest::post()
            .uri("/v1/claims")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "bad_request");
    }

    #[actix_web::test]
    async fn test_missing_token_rejected() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![]));
        let app = init_app!(fixture);

        let req = claim_request(json!({"claim": "Rome fell in 476."}), None).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fixture.generator.calls(), 0);
    }

    #[actix_web::test]
    async fn test_refresh_token_rejected() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, Some("refresh"));

        let req = claim_request(json!({"claim": "Rome fell in 476."}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_provider_timeout_is_bad_gateway() {
        let fixture = Fixture::new(
            FakeGenerator::replying(vec![Ok((
                analysis_json(5, 3, "https://example.org", true),
                UsageMetrics::new(100, 0.001),
            ))])
            .with_delay(Duration::from_secs(5)),
        );
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({"claim": "Rome fell in 1453."}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Analysis temporarily unavailable");
        assert!(fixture.store.records().is_empty());
    }

    #[actix_web::test]
    async fn test_rate_limited_provider_sets_retry_after() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![Err(
            ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(20)),
            },
        )]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({"claim": "Rome fell in 476."}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "20");
        assert!(fixture.store.records().is_empty());
    }

    #[actix_web::test]
    async fn test_malformed_output_reports_usage_and_stores_nothing() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![Ok((
            "I cannot answer that as JSON.".to_string(),
            UsageMetrics::new(250, 0.0075),
        ))]));
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({"claim": "Rome fell in 476."}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Could not complete analysis");
        assert_eq!(body["usage"]["totalTokens"], 250);
        assert!(!body.to_string().contains("cannot answer"));
        assert!(fixture.store.records().is_empty());
    }

    #[actix_web::test]
    async fn test_shutdown_abandons_analysis_and_stores_nothing() {
        let fixture = Fixture::new(FakeGenerator::replying(vec![Ok((
            analysis_json(5, 3, "https://example.org", true),
            UsageMetrics::new(100, 0.001),
        ))]));
        fixture.shutdown.cancel();
        let app = init_app!(fixture);
        let token = issue_token(SECRET, "ada@example.org", 3600, None);

        let req = claim_request(json!({"claim": "Rome fell in 476."}), Some(&token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "shutting_down");
        assert_eq!(fixture.generator.calls(), 0);
        assert!(fixture.store.records().is_empty());
    }
}
