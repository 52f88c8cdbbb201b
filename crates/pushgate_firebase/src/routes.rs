use axum::{
    routing::{get, post},
    Router,
};
use pushgate_config::AppConfig;
use std::sync::Arc;
use tracing::info;

use crate::error::ProviderError;
use crate::handlers::{
    health_handler, register_token_handler, send_to_token_handler, send_to_user_handler,
    unregister_token_handler, update_token_handler, user_tokens_handler, PushState,
};
use crate::service::PushServiceFactory;

/// Create the push gateway routes from the application configuration
///
/// Builds a fresh in-memory registry and an FCM client from `config` and
/// returns a router with every push endpoint.
///
/// # Errors
///
/// Fails if the FCM HTTP client cannot be constructed.
pub fn routes(config: Arc<AppConfig>) -> Result<Router, ProviderError> {
    let service_factory = PushServiceFactory::new(config);
    let dispatch = service_factory.dispatch_service()?;

    info!("Push routes initialized");

    Ok(router(Arc::new(PushState::new(Arc::new(dispatch)))))
}

/// Create the push gateway routes over existing state
pub fn router(state: Arc<PushState>) -> Router {
    Router::new()
        .route("/push/register", post(register_token_handler))
        .route("/push/update", post(update_token_handler))
        .route("/push/unregister", post(unregister_token_handler))
        .route("/push/send-to-user", post(send_to_user_handler))
        .route("/push/send-to-token", post(send_to_token_handler))
        .route("/push/users/{user_id}/tokens", get(user_tokens_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
