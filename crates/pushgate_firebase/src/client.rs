//! Firebase Cloud Messaging client module
//!
//! This module provides a client for the Firebase Cloud Messaging (FCM) HTTP v1
//! API and implements [`PushProvider`] on top of it. Only data-only messages
//! addressed to device tokens are sent.
//!
//! FCM v1 has no batch endpoint, so a multicast send issues one request per
//! token concurrently, sharing a single access token.

use async_trait::async_trait;
use pushgate_config::FirebaseConfig;
use pushgate_registry::events::token_hint;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::auth::{AccessTokenSource, ServiceAccountTokenSource};
use crate::error::ProviderError;
use crate::provider::{ErrorCode, Priority, PushProvider, SendOptions, SendOutcome};

/// A message to be sent via Firebase Cloud Messaging
///
/// This is the top-level structure that wraps a Message object
/// according to the FCM HTTP v1 API format.
#[derive(Debug, Clone, Serialize)]
pub struct FcmMessage {
    pub message: Message,
}

/// A data-only message addressed to one device token.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub token: String,

    /// Custom key-value data; FCM only accepts string values
    pub data: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

/// Android-specific delivery options.
#[derive(Debug, Clone, Serialize)]
pub struct AndroidConfig {
    /// "HIGH" or "NORMAL"
    pub priority: String,

    /// Duration in seconds with an "s" suffix, e.g. "3600s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
}

/// APNs-specific delivery options, expressed as APNs request headers.
#[derive(Debug, Clone, Serialize)]
pub struct ApnsConfig {
    pub headers: HashMap<String, String>,
}

impl FcmMessage {
    /// Builds a data-only message for `token` with the given options applied.
    pub fn data_only(token: &str, data: HashMap<String, String>, options: &SendOptions) -> Self {
        let priority = match options.priority {
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
        };

        let android = AndroidConfig {
            priority: priority.to_string(),
            ttl: options.ttl_seconds.map(|ttl| format!("{ttl}s")),
            collapse_key: options.collapse_key.clone(),
        };

        let apns = options.collapse_key.as_ref().map(|collapse_key| ApnsConfig {
            headers: HashMap::from([("apns-collapse-id".to_string(), collapse_key.clone())]),
        });

        Self {
            message: Message {
                token: token.to_string(),
                data,
                android: Some(android),
                apns,
            },
        }
    }
}

/// Response from the Firebase Cloud Messaging API
///
/// `name` has the form "projects/{project_id}/messages/{message_id}".
#[derive(Debug, Deserialize)]
pub struct FcmResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorBody {
    error: FcmErrorStatus,
}

#[derive(Debug, Deserialize)]
struct FcmErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Classifies a non-success FCM response body.
///
/// The `errorCode` of the FCM error detail wins over the generic RPC status.
/// FCM reports malformed tokens as `INVALID_ARGUMENT`, recognisable only by
/// the message naming the registration token.
pub fn classify_error_response(status: u16, body: &str) -> ProviderError {
    let Ok(parsed) = serde_json::from_str::<FcmErrorBody>(body) else {
        let code = match status {
            429 => ErrorCode::QuotaExceeded,
            500 => ErrorCode::Internal,
            503 => ErrorCode::Unavailable,
            _ => ErrorCode::Unknown,
        };
        return ProviderError::ApiError {
            status,
            code,
            message: body.to_string(),
        };
    };

    let error = parsed.error;
    let raw_code = error
        .details
        .iter()
        .find_map(|detail| detail.error_code.as_deref())
        .or(error.status.as_deref())
        .unwrap_or_default();

    let code = match ErrorCode::from_fcm(raw_code) {
        ErrorCode::InvalidArgument
            if error.message.to_lowercase().contains("registration token") =>
        {
            ErrorCode::InvalidRegistrationToken
        }
        code => code,
    };

    ProviderError::ApiError {
        status,
        code,
        message: error.message,
    }
}

/// Client for interacting with the Firebase Cloud Messaging API
pub struct FirebaseClient {
    /// HTTP client for making requests to the FCM API
    client: Client,

    /// Configuration for Firebase, including project ID and API base URL
    config: FirebaseConfig,

    token_source: Arc<dyn AccessTokenSource>,
}

impl FirebaseClient {
    /// Creates a client that authenticates with the configured service account key.
    pub fn new(config: FirebaseConfig) -> Result<Self, ProviderError> {
        let token_source = Arc::new(ServiceAccountTokenSource::new(config.clone()));
        Self::with_token_source(config, token_source)
    }

    /// Creates a client with a custom access token source.
    pub fn with_token_source(
        config: FirebaseConfig,
        token_source: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            token_source,
        })
    }

    fn send_url(&self) -> Result<String, ProviderError> {
        let project_id = self.config.project_id.as_deref().ok_or_else(|| {
            ProviderError::ConfigError("Missing project_id in FirebaseConfig".to_string())
        })?;

        Ok(format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base_url.trim_end_matches('/'),
            project_id
        ))
    }

    /// Sends one message and returns the FCM message name.
    ///
    /// # Errors
    ///
    /// Fails if the project_id is missing, authentication fails, the HTTP
    /// request fails, or FCM rejects the message.
    pub async fn send_message(&self, message: &FcmMessage) -> Result<String, ProviderError> {
        let url = self.send_url()?;
        let access_token = self.token_source.access_token().await?;
        post_message(&self.client, &url, &access_token, message).await
    }
}

async fn post_message(
    client: &Client,
    url: &str,
    access_token: &str,
    message: &FcmMessage,
) -> Result<String, ProviderError> {
    let response = client
        .post(url)
        .bearer_auth(access_token)
        .json(message)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(classify_error_response(status.as_u16(), &error_text));
    }

    let fcm_response: FcmResponse = response.json().await?;
    Ok(fcm_response.name)
}

fn outcome_from(result: Result<String, ProviderError>) -> SendOutcome {
    match result {
        Ok(message_id) => SendOutcome::delivered(message_id),
        Err(ProviderError::ApiError { code, message, .. }) => SendOutcome::failed(code, message),
        Err(err @ ProviderError::RequestError(_)) => {
            SendOutcome::failed(ErrorCode::Unavailable, err.to_string())
        }
        Err(err) => SendOutcome::failed(ErrorCode::Unknown, err.to_string()),
    }
}

#[async_trait]
impl PushProvider for FirebaseClient {
    async fn send_single(
        &self,
        token: &str,
        data: &HashMap<String, String>,
        options: &SendOptions,
    ) -> Result<String, ProviderError> {
        let message = FcmMessage::data_only(token, data.clone(), options);
        self.send_message(&message).await
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        data: &HashMap<String, String>,
        options: &SendOptions,
    ) -> Result<Vec<SendOutcome>, ProviderError> {
        let url: Arc<str> = self.send_url()?.into();
        let access_token: Arc<str> = self.token_source.access_token().await?.into();

        let mut tasks = JoinSet::new();
        for (index, token) in tokens.iter().enumerate() {
            let client = self.client.clone();
            let url = Arc::clone(&url);
            let access_token = Arc::clone(&access_token);
            let message = FcmMessage::data_only(token, data.clone(), options);

            tasks.spawn(async move {
                let result = post_message(&client, &url, &access_token, &message).await;
                (index, result)
            });
        }

        let mut outcomes: Vec<Option<SendOutcome>> = vec![None; tokens.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(err) = &result {
                        debug!(token = %token_hint(&tokens[index]), error = %err, "FCM send failed");
                    }
                    outcomes[index] = Some(outcome_from(result));
                }
                Err(err) => error!("FCM send task failed: {}", err),
            }
        }

        Ok(outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    warn!("FCM send task ended without an outcome");
                    SendOutcome::failed(ErrorCode::Internal, "send task did not complete")
                })
            })
            .collect())
    }
}
