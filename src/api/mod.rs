pub mod auth;
pub mod claims;
pub mod error;
pub mod health;
pub mod openapi;

use actix_web::web;

use error::ApiError;

/// Register every API route
///
/// Malformed JSON bodies are reported through [`ApiError`] like any other
/// request error.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    cfg.app_data(json_config)
        .configure(claims::configure)
        .configure(health::configure)
        .configure(openapi::configure);
}
