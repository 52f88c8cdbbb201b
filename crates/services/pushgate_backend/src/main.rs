// File: services/pushgate_backend/src/main.rs
use axum::{routing::get, Router};
use pushgate_common::{logging, GatewayError};
use pushgate_config::load_config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    let config = Arc::new(load_config()?);
    // Dropping the guard flushes and stops the file writer.
    let _log_guard = logging::init_with_config(&config.logging)?;

    let push_router = pushgate_firebase::routes(config.clone())
        .map_err(|e| GatewayError::ConfigError(format!("Failed to set up push routes: {e}")))?;

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the Pushgate API!" }))
        .merge(push_router);

    let app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logging::log_error(e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
