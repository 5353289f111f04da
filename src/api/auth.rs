//! Bearer-token identity for API requests
//!
//! Tokens are issued elsewhere; this module only verifies them and exposes the
//! caller's identity to handlers.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use super::error::ApiError;

const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims read from an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User identity (the account email)
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    /// `access` or `refresh`
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

/// Verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ApiError> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {}", e)))?;

        if claims.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE) {
            return Err(ApiError::Unauthorized(
                "refresh tokens cannot be used for this request".to_string(),
            ));
        }
        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized("token has no subject".to_string()));
        }

        Ok(claims)
    }
}

/// Identity of the authenticated caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl AuthenticatedUser {
    fn resolve(req: &HttpRequest) -> Result<Self, ApiError> {
        let verifier = req
            .app_data::<web::Data<TokenVerifier>>()
            .ok_or_else(|| ApiError::Internal("token verifier not configured".to_string()))?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let claims = verifier.verify(token)?;
        Ok(Self {
            user_id: claims.sub,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::resolve(req))
    }
}
