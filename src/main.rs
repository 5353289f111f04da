use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod db;
mod model;
mod service;

#[cfg(test)]
mod test_support;

use app::AppState;
use model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application");
        std::io::Error::other(e.to_string())
    })?;

    let analysis_service = web::Data::from(state.analysis_service);
    let claim_store = web::Data::from(state.claim_store);
    let db_pool = web::Data::new(state.db_pool);
    let token_verifier = web::Data::new(state.token_verifier);
    let shutdown = web::Data::new(state.shutdown.clone());

    // In-flight analyses stop waiting on the provider once shutdown starts
    let shutdown_signal = state.shutdown;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, cancelling in-flight analyses");
            shutdown_signal.cancel();
        }
    });

    tracing::info!("Starting NeutralView server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(analysis_service.clone())
            .app_data(claim_store.clone())
            .app_data(db_pool.clone())
            .app_data(token_verifier.clone())
            .app_data(shutdown.clone())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
