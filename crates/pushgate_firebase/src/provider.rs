//! The contract between the dispatcher and a push-delivery provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ProviderError;

/// Delivery priority hint passed to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Wakes the device; data-only messages are otherwise deferred while the app is in the background
    #[default]
    High,
    Normal,
}

/// Provider options for a send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendOptions {
    pub priority: Priority,
    /// How long the provider keeps the message for an offline device
    pub ttl_seconds: Option<u64>,
    /// Messages sharing a collapse key replace each other while undelivered
    pub collapse_key: Option<String>,
}

/// Provider classification of a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "messaging/registration-token-not-registered")]
    Unregistered,
    #[serde(rename = "messaging/invalid-registration-token")]
    InvalidRegistrationToken,
    #[serde(rename = "messaging/invalid-argument")]
    InvalidArgument,
    #[serde(rename = "messaging/mismatched-credential")]
    SenderIdMismatch,
    #[serde(rename = "messaging/message-rate-exceeded")]
    QuotaExceeded,
    #[serde(rename = "messaging/server-unavailable")]
    Unavailable,
    #[serde(rename = "messaging/internal-error")]
    Internal,
    #[serde(rename = "messaging/third-party-auth-error")]
    ThirdPartyAuthError,
    #[serde(rename = "messaging/unknown-error")]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unregistered => "messaging/registration-token-not-registered",
            ErrorCode::InvalidRegistrationToken => "messaging/invalid-registration-token",
            ErrorCode::InvalidArgument => "messaging/invalid-argument",
            ErrorCode::SenderIdMismatch => "messaging/mismatched-credential",
            ErrorCode::QuotaExceeded => "messaging/message-rate-exceeded",
            ErrorCode::Unavailable => "messaging/server-unavailable",
            ErrorCode::Internal => "messaging/internal-error",
            ErrorCode::ThirdPartyAuthError => "messaging/third-party-auth-error",
            ErrorCode::Unknown => "messaging/unknown-error",
        }
    }

    /// Maps an FCM v1 `errorCode` or `status` value.
    pub fn from_fcm(code: &str) -> Self {
        match code {
            "UNREGISTERED" | "NOT_FOUND" => ErrorCode::Unregistered,
            "INVALID_ARGUMENT" => ErrorCode::InvalidArgument,
            "SENDER_ID_MISMATCH" | "PERMISSION_DENIED" => ErrorCode::SenderIdMismatch,
            "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => ErrorCode::QuotaExceeded,
            "UNAVAILABLE" => ErrorCode::Unavailable,
            "INTERNAL" => ErrorCode::Internal,
            "THIRD_PARTY_AUTH_ERROR" | "UNAUTHENTICATED" => ErrorCode::ThirdPartyAuthError,
            _ => ErrorCode::Unknown,
        }
    }

    /// True when the token will never accept delivery again.
    pub fn is_token_invalid(&self) -> bool {
        matches!(
            self,
            ErrorCode::Unregistered | ErrorCode::InvalidRegistrationToken
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of delivering to one token of a multicast send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// A failure classified as a permanently invalid token.
    pub fn is_token_invalid(&self) -> bool {
        !self.success && self.error_code.is_some_and(|code| code.is_token_invalid())
    }
}

/// A push-delivery provider.
///
/// `send_multicast` returns one outcome per input token in input order. An
/// `Err` from either method means the call as a whole failed.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Sends `data` to one token and returns the provider's message id.
    async fn send_single(
        &self,
        token: &str,
        data: &HashMap<String, String>,
        options: &SendOptions,
    ) -> Result<String, ProviderError>;

    /// Sends `data` to every token in `tokens`.
    async fn send_multicast(
        &self,
        tokens: &[String],
        data: &HashMap<String, String>,
        options: &SendOptions,
    ) -> Result<Vec<SendOutcome>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unregistered_and_malformed_tokens_are_permanent() {
        assert!(ErrorCode::Unregistered.is_token_invalid());
        assert!(ErrorCode::InvalidRegistrationToken.is_token_invalid());
        assert!(!ErrorCode::Unavailable.is_token_invalid());
        assert!(!ErrorCode::QuotaExceeded.is_token_invalid());
        assert!(!ErrorCode::InvalidArgument.is_token_invalid());
    }

    #[test]
    fn test_error_code_serializes_as_provider_code() {
        let json = serde_json::to_string(&ErrorCode::Unregistered).unwrap();
        assert_eq!(json, "\"messaging/registration-token-not-registered\"");
        assert_eq!(ErrorCode::Unregistered.to_string(), ErrorCode::Unregistered.as_str());
    }

    #[test]
    fn test_send_options_default_to_high_priority() {
        let options: SendOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.priority, Priority::High);

        let options: SendOptions =
            serde_json::from_str(r#"{"priority":"normal","ttlSeconds":60}"#).unwrap();
        assert_eq!(options.priority, Priority::Normal);
        assert_eq!(options.ttl_seconds, Some(60));
    }

    #[test]
    fn test_successful_outcome_is_never_invalid() {
        let outcome = SendOutcome {
            success: true,
            message_id: Some("m".into()),
            error_code: Some(ErrorCode::Unregistered),
            error_message: None,
        };
        assert!(!outcome.is_token_invalid());
        assert!(SendOutcome::failed(ErrorCode::Unregistered, "gone").is_token_invalid());
    }
}
