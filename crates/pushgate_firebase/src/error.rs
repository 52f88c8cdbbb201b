//! Error types for provider calls and dispatch operations.

use pushgate_common::HttpStatusCode;
use thiserror::Error;

use crate::provider::ErrorCode;

/// Errors raised by a push provider call as a whole.
///
/// Per-token failures inside a multicast response are not errors; they are
/// reported as failed [`crate::provider::SendOutcome`]s.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Obtaining an access token for the provider failed
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The HTTP request to the provider failed
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Missing required configuration
    #[error("Missing configuration: {0}")]
    ConfigError(String),

    /// The provider rejected the message
    #[error("Firebase API error ({status}, {code}): {message}")]
    ApiError {
        status: u16,
        code: ErrorCode,
        message: String,
    },
}

impl ProviderError {
    /// The provider classification, if the provider answered at all.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ProviderError::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors returned by the dispatch and registration operations.
#[derive(Error, Debug)]
pub enum PushError {
    /// A required identifying field was missing at the boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The user has no registered tokens
    #[error("No tokens registered for user: {0}")]
    NoTokensForUser(String),

    /// The provider call failed; the original error is kept intact
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl HttpStatusCode for PushError {
    fn status_code(&self) -> u16 {
        match self {
            PushError::InvalidRequest(_) => 400,
            PushError::NoTokensForUser(_) => 404,
            PushError::Provider(ProviderError::ConfigError(_)) => 500,
            PushError::Provider(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PushError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(PushError::NoTokensForUser("u".into()).status_code(), 404);
        assert_eq!(
            PushError::from(ProviderError::ConfigError("project_id".into())).status_code(),
            500
        );
        assert_eq!(
            PushError::from(ProviderError::AuthError("expired".into())).status_code(),
            502
        );
    }

    #[test]
    fn test_provider_error_is_transparent() {
        let err = PushError::from(ProviderError::ApiError {
            status: 404,
            code: ErrorCode::Unregistered,
            message: "Requested entity was not found.".into(),
        });

        assert_eq!(
            err.to_string(),
            "Firebase API error (404, messaging/registration-token-not-registered): Requested entity was not found."
        );
    }
}
