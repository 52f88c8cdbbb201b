//! HTTP handlers for token registration and push dispatch
//!
//! Handlers validate identifying fields, call the registry or the dispatch
//! service, and answer with a JSON body carrying `success` and, on failure,
//! `error`. Missing identifiers never reach the core.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pushgate_common::HttpStatusCode;
use pushgate_registry::{Registration, TokenRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::PushError;
use crate::payload::Payload;
use crate::provider::SendOptions;
use crate::service::{DispatchService, DispatchSummary};

/// Shared state for the push handlers
#[derive(Clone)]
pub struct PushState {
    pub dispatch: Arc<DispatchService>,
}

impl PushState {
    pub fn new(dispatch: Arc<DispatchService>) -> Self {
        Self { dispatch }
    }

    fn registry(&self) -> &TokenRegistry {
        self.dispatch.registry()
    }
}

/// Request body for registering a device token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub platform: Option<String>,
}

/// Request body for replacing a device token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenRequest {
    pub user_id: Option<String>,
    pub token: Option<String>,
    /// The token being replaced, if the client knows it
    pub old_token: Option<String>,
    pub platform: Option<String>,
}

/// Request body for unregistering a device token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterTokenRequest {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// Response body for the registration endpoints
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub user_id: Option<String>,
    pub error: Option<String>,
}

/// Request body for sending to every device of a user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserRequest {
    pub user_id: Option<String>,
    pub data: Option<Payload>,
    #[serde(alias = "providerOptions")]
    pub options: Option<SendOptions>,
}

/// Response body for the send-to-user endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToUserResponse {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub invalid_tokens_removed: usize,
    pub error: Option<String>,
}

/// Request body for sending to a single token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToTokenRequest {
    pub token: Option<String>,
    pub data: Option<Payload>,
    #[serde(alias = "providerOptions")]
    pub options: Option<SendOptions>,
}

/// Response body for the send-to-token endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToTokenResponse {
    pub success: bool,
    /// The provider's message id, returned unchanged
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Response body for the token listing endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTokensResponse {
    pub user_id: String,
    pub registrations: Vec<Registration>,
}

/// Response body for the health endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub users: usize,
    pub tokens: usize,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Returns the field unchanged, or an `InvalidRequest` naming it when absent or blank.
///
/// Identifiers are opaque; whitespace is only inspected, never stripped.
fn require(value: Option<String>, field: &str) -> Result<String, PushError> {
    value
        .filter(|value| !is_blank(value))
        .ok_or_else(|| PushError::InvalidRequest(format!("{field} is required")))
}

/// Validates the `userId`/`token` pair, keeping the raw user id for the error body.
fn require_identity(
    user_id: Option<String>,
    token: Option<String>,
) -> Result<(String, String), (PushError, Option<String>)> {
    let raw_user_id = user_id.clone();
    let user_id = require(user_id, "userId").map_err(|err| (err, raw_user_id.clone()))?;
    let token = require(token, "token").map_err(|err| (err, raw_user_id))?;
    Ok((user_id, token))
}

fn status_of(err: &PushError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn token_failure(err: PushError, user_id: Option<String>) -> Response {
    (
        status_of(&err),
        Json(TokenResponse {
            success: false,
            user_id,
            error: Some(err.to_string()),
        }),
    )
        .into_response()
}

fn token_success(user_id: String) -> Response {
    Json(TokenResponse {
        success: true,
        user_id: Some(user_id),
        error: None,
    })
    .into_response()
}

/// Handler for registering a device token for a user
///
/// # Responses
///
/// - 200 OK: Token registered
/// - 400 Bad Request: `userId` or `token` missing
pub async fn register_token_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<RegisterTokenRequest>,
) -> Response {
    let (user_id, token) = match require_identity(payload.user_id, payload.token) {
        Ok(fields) => fields,
        Err((err, user_id)) => return token_failure(err, user_id),
    };

    debug!("Registering token for user: {}", user_id);
    state
        .registry()
        .upsert(&user_id, &token, payload.platform.as_deref());

    token_success(user_id)
}

/// Handler for replacing a device token
///
/// If `oldToken` is present and differs from `token`, the old token is
/// removed before the new one is registered.
///
/// # Responses
///
/// - 200 OK: Token updated
/// - 400 Bad Request: `userId` or `token` missing
pub async fn update_token_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<UpdateTokenRequest>,
) -> Response {
    let (user_id, token) = match require_identity(payload.user_id, payload.token) {
        Ok(fields) => fields,
        Err((err, user_id)) => return token_failure(err, user_id),
    };
    let old_token = payload.old_token.filter(|old_token| !is_blank(old_token));

    debug!("Updating token for user: {}", user_id);
    state.registry().replace(
        &user_id,
        old_token.as_deref(),
        &token,
        payload.platform.as_deref(),
    );

    token_success(user_id)
}

/// Handler for unregistering a device token
///
/// # Responses
///
/// - 200 OK: Token removed, or was not registered
/// - 400 Bad Request: `userId` or `token` missing
pub async fn unregister_token_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<UnregisterTokenRequest>,
) -> Response {
    let (user_id, token) = match require_identity(payload.user_id, payload.token) {
        Ok(fields) => fields,
        Err((err, user_id)) => return token_failure(err, user_id),
    };

    debug!("Unregistering token for user: {}", user_id);
    state.registry().remove(&user_id, &token);

    token_success(user_id)
}

async fn send_to_user(
    state: &PushState,
    payload: SendToUserRequest,
) -> Result<DispatchSummary, PushError> {
    let user_id = require(payload.user_id, "userId")?;
    let data = payload
        .data
        .ok_or_else(|| PushError::InvalidRequest("data is required".to_string()))?;
    state
        .dispatch
        .send_to_user(&user_id, &data, payload.options)
        .await
}

async fn send_to_token(state: &PushState, payload: SendToTokenRequest) -> Result<String, PushError> {
    let token = require(payload.token, "token")?;
    let data = payload
        .data
        .ok_or_else(|| PushError::InvalidRequest("data is required".to_string()))?;
    state
        .dispatch
        .send_to_token(&token, &data, payload.options)
        .await
}

/// Handler for sending a data-only message to all devices of a user
///
/// # Responses
///
/// - 200 OK: Provider called; per-token results are in the counts
/// - 400 Bad Request: `userId` or `data` missing
/// - 404 Not Found: The user has no registered tokens
/// - 502 Bad Gateway: The provider call failed
pub async fn send_to_user_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<SendToUserRequest>,
) -> Response {
    let result = send_to_user(&state, payload).await;

    match result {
        Ok(summary) => Json(SendToUserResponse {
            success: true,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            invalid_tokens_removed: summary.invalid_tokens_removed,
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to send to user: {}", err);
            (
                status_of(&err),
                Json(SendToUserResponse {
                    success: false,
                    success_count: 0,
                    failure_count: 0,
                    invalid_tokens_removed: 0,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Handler for sending a data-only message to a single token
///
/// # Responses
///
/// - 200 OK: Message accepted; `messageId` is the provider's id
/// - 400 Bad Request: `token` or `data` missing
/// - 502 Bad Gateway: The provider rejected the message or could not be reached
pub async fn send_to_token_handler(
    State(state): State<Arc<PushState>>,
    Json(payload): Json<SendToTokenRequest>,
) -> Response {
    let result = send_to_token(&state, payload).await;

    match result {
        Ok(message_id) => Json(SendToTokenResponse {
            success: true,
            message_id: Some(message_id),
            error: None,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to send to token: {}", err);
            (
                status_of(&err),
                Json(SendToTokenResponse {
                    success: false,
                    message_id: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Handler listing the registrations of a user
pub async fn user_tokens_handler(
    State(state): State<Arc<PushState>>,
    Path(user_id): Path<String>,
) -> Json<UserTokensResponse> {
    let registrations = state.registry().registrations_of(&user_id);
    Json(UserTokensResponse {
        user_id,
        registrations,
    })
}

/// Handler reporting liveness and registry size
pub async fn health_handler(State(state): State<Arc<PushState>>) -> Json<HealthResponse> {
    let stats = state.registry().stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        users: stats.users,
        tokens: stats.tokens,
    })
}
