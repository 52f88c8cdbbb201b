//! Authentication module for Firebase Cloud Messaging
//!
//! FCM HTTP v1 requests carry an OAuth2 bearer token. The default source
//! reads a service account key file once, builds a yup-oauth2 authenticator
//! with the `firebase.messaging` scope and keeps it, so tokens are cached and
//! refreshed by the authenticator instead of exchanged on every send.

use async_trait::async_trait;
use pushgate_config::FirebaseConfig;
use std::{path::Path, sync::Arc};
use tokio::sync::OnceCell;
use tracing::debug;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

use crate::error::ProviderError;

/// Scope required by the FCM HTTP v1 API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Supplies bearer tokens for FCM requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;
}

/// Issues OAuth2 tokens for a set of scopes, caching them between calls.
#[async_trait]
pub trait ScopedTokenIssuer: Send + Sync {
    async fn token(&self, scopes: &[&str]) -> Result<String, ProviderError>;
}

#[async_trait]
impl ScopedTokenIssuer for DefaultAuthenticator {
    async fn token(&self, scopes: &[&str]) -> Result<String, ProviderError> {
        let access_token = DefaultAuthenticator::token(self, scopes)
            .await
            .map_err(|e| ProviderError::AuthError(e.to_string()))?;

        access_token
            .token()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::AuthError("No token available".to_string()))
    }
}

/// Access tokens from the service account key named in the configuration.
///
/// The authenticator is built on first use and reused afterwards. A failed
/// build is not cached; the next call tries again.
pub struct ServiceAccountTokenSource {
    config: FirebaseConfig,
    issuer: OnceCell<Arc<dyn ScopedTokenIssuer>>,
}

impl ServiceAccountTokenSource {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            config,
            issuer: OnceCell::new(),
        }
    }

    /// Uses `issuer` instead of building one from the key file.
    pub fn with_issuer(config: FirebaseConfig, issuer: Arc<dyn ScopedTokenIssuer>) -> Self {
        Self {
            config,
            issuer: OnceCell::new_with(Some(issuer)),
        }
    }

    /// Whether the token issuer has been built.
    pub fn is_initialized(&self) -> bool {
        self.issuer.initialized()
    }

    async fn issuer(&self) -> Result<&Arc<dyn ScopedTokenIssuer>, ProviderError> {
        self.issuer
            .get_or_try_init(|| async {
                let authenticator = build_authenticator(&self.config).await?;
                Ok::<_, ProviderError>(Arc::new(authenticator) as Arc<dyn ScopedTokenIssuer>)
            })
            .await
    }
}

impl std::fmt::Debug for ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenSource")
            .field("key_path", &self.config.key_path)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, ProviderError> {
        self.issuer().await?.token(&[FCM_SCOPE]).await
    }
}

/// A fixed bearer token, for emulators and tests.
#[derive(Debug, Clone)]
pub struct StaticTokenSource(pub String);

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Builds a service account authenticator for Firebase Cloud Messaging
///
/// # Errors
///
/// This function will return an error if:
/// * The key_path is missing from the FirebaseConfig (`ConfigError`)
/// * The service account key file cannot be read (`AuthError`)
/// * The authenticator cannot be constructed from the key (`AuthError`)
pub async fn build_authenticator(
    config: &FirebaseConfig,
) -> Result<DefaultAuthenticator, ProviderError> {
    let key_path = config.key_path.as_deref().ok_or_else(|| {
        ProviderError::ConfigError("Missing key_path in FirebaseConfig".to_string())
    })?;

    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|e| ProviderError::AuthError(e.to_string()))?;
    let authenticator = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| ProviderError::AuthError(e.to_string()))?;

    debug!(key_path = %key_path, "Firebase authenticator built");
    Ok(authenticator)
}
