// --- File: crates/pushgate_common/src/error.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while bootstrapping or serving the gateway.
///
/// Request-scoped failures have their own error types in the feature crates;
/// this enum covers what can stop the process from starting.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Binding the listener or serving requests failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl From<config::ConfigError> for GatewayError {
    fn from(err: config::ConfigError) -> Self {
        GatewayError::ConfigError(err.to_string())
    }
}

/// A trait for converting errors to HTTP status codes.
///
/// Implemented by every error type that can reach an HTTP handler so that
/// status mapping lives next to the error definition.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for GatewayError {
    fn status_code(&self) -> u16 {
        500
    }
}

/// Builds the JSON error body shared by all endpoints.
pub fn error_response<E>(error: &E) -> Response
where
    E: HttpStatusCode + std::fmt::Display,
{
    let status_code =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = Json(json!({
        "error": {
            "message": error.to_string(),
            "code": status_code.as_u16(),
        }
    }));

    (status_code, body).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Teapot;

    impl std::fmt::Display for Teapot {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "short and stout")
        }
    }

    impl HttpStatusCode for Teapot {
        fn status_code(&self) -> u16 {
            418
        }
    }

    #[test]
    fn test_error_response_uses_status_code() {
        let response = error_response(&Teapot);
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_invalid_status_code_falls_back_to_500() {
        struct Broken;
        impl std::fmt::Display for Broken {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "broken")
            }
        }
        impl HttpStatusCode for Broken {
            fn status_code(&self) -> u16 {
                1000
            }
        }

        let response = error_response(&Broken);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_error_conversion() {
        let err: GatewayError = config::ConfigError::Message("bad port".to_string()).into();
        assert!(err.to_string().contains("bad port"));
        assert_eq!(err.status_code(), 500);
    }
}
