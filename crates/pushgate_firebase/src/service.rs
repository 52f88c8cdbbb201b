//! Fan-out dispatch of data-only messages to registered device tokens.

use pushgate_config::AppConfig;
use pushgate_registry::{events::token_hint, RemovalReason, TokenRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::FirebaseClient;
use crate::error::{ProviderError, PushError};
use crate::payload::{normalize_payload, Payload};
use crate::provider::{PushProvider, SendOptions, SendOutcome};

/// FCM accepts at most this many tokens per multicast.
pub const DEFAULT_MULTICAST_BATCH_SIZE: usize = 500;

/// Aggregate result of a send to all of a user's devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub success_count: usize,
    pub failure_count: usize,
    /// Tokens dropped from the registry because the provider reported them invalid
    pub invalid_tokens_removed: usize,
}

/// Resolves users to tokens, sends through the provider, and feeds
/// permanently invalid tokens back into the registry.
pub struct DispatchService {
    registry: Arc<TokenRegistry>,
    provider: Arc<dyn PushProvider>,
    multicast_batch_size: usize,
}

impl DispatchService {
    pub fn new(registry: Arc<TokenRegistry>, provider: Arc<dyn PushProvider>) -> Self {
        Self {
            registry,
            provider,
            multicast_batch_size: DEFAULT_MULTICAST_BATCH_SIZE,
        }
    }

    /// Caps the number of tokens per multicast call. Zero is treated as one.
    pub fn with_batch_size(mut self, multicast_batch_size: usize) -> Self {
        self.multicast_batch_size = multicast_batch_size.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    /// Sends `payload` to every device registered for `user_id`.
    ///
    /// Tokens the provider classifies as permanently invalid are removed from
    /// the registry. Nothing is retried.
    ///
    /// # Errors
    ///
    /// * [`PushError::NoTokensForUser`] if the user has no tokens; the provider is not called
    /// * [`PushError::Provider`] if a provider call fails as a whole
    pub async fn send_to_user(
        &self,
        user_id: &str,
        payload: &Payload,
        options: Option<SendOptions>,
    ) -> Result<DispatchSummary, PushError> {
        let tokens: Vec<String> = self.registry.tokens_of(user_id).into_iter().collect();
        if tokens.is_empty() {
            return Err(PushError::NoTokensForUser(user_id.to_string()));
        }

        let data = normalize_payload(payload);
        let options = options.unwrap_or_default();
        let mut summary = DispatchSummary::default();

        debug!(
            user_id = %user_id,
            tokens = tokens.len(),
            "sending to user"
        );

        for batch in tokens.chunks(self.multicast_batch_size) {
            let outcomes = self
                .provider
                .send_multicast(batch, &data, &options)
                .await
                .map_err(|err| {
                    warn!(user_id = %user_id, error = %err, "multicast send failed");
                    err
                })?;

            if outcomes.len() != batch.len() {
                warn!(
                    expected = batch.len(),
                    received = outcomes.len(),
                    "provider returned a misaligned outcome list"
                );
            }

            for outcome in &outcomes {
                if outcome.success {
                    summary.success_count += 1;
                } else {
                    summary.failure_count += 1;
                }
            }

            for (token, outcome) in batch.iter().zip(&outcomes) {
                if self.evict_if_invalid(token, outcome) {
                    summary.invalid_tokens_removed += 1;
                }
            }
        }

        info!(
            user_id = %user_id,
            success_count = summary.success_count,
            failure_count = summary.failure_count,
            invalid_tokens_removed = summary.invalid_tokens_removed,
            "sent to user"
        );

        Ok(summary)
    }

    /// Sends `payload` to a single token and returns the provider's message id.
    ///
    /// No registry cleanup happens on this path, whatever the failure.
    pub async fn send_to_token(
        &self,
        token: &str,
        payload: &Payload,
        options: Option<SendOptions>,
    ) -> Result<String, PushError> {
        let data = normalize_payload(payload);
        let options = options.unwrap_or_default();

        let message_id = self
            .provider
            .send_single(token, &data, &options)
            .await
            .map_err(|err: ProviderError| {
                warn!(token = %token_hint(token), error = %err, "single send failed");
                err
            })?;

        info!(token = %token_hint(token), message_id = %message_id, "sent to token");
        Ok(message_id)
    }

    /// Removes `token` from its current owner if `outcome` marks it permanently invalid.
    fn evict_if_invalid(&self, token: &str, outcome: &SendOutcome) -> bool {
        if !outcome.is_token_invalid() {
            return false;
        }

        match self.registry.metadata_of(token) {
            Some(metadata) => {
                self.registry
                    .remove_with_reason(&metadata.user_id, token, RemovalReason::Invalid);
                true
            }
            None => {
                debug!(token = %token_hint(token), "invalid token already gone");
                false
            }
        }
    }
}

/// Builds the registry, provider and dispatcher from the application config.
pub struct PushServiceFactory {
    config: Arc<AppConfig>,
}

impl PushServiceFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    pub fn registry(&self) -> Arc<TokenRegistry> {
        Arc::new(TokenRegistry::new(
            self.config.firebase.default_platform.clone(),
        ))
    }

    pub fn provider(&self) -> Result<Arc<dyn PushProvider>, ProviderError> {
        Ok(Arc::new(FirebaseClient::new(self.config.firebase.clone())?))
    }

    /// A dispatcher over a fresh registry and the FCM provider.
    pub fn dispatch_service(&self) -> Result<DispatchService, ProviderError> {
        Ok(DispatchService::new(self.registry(), self.provider()?)
            .with_batch_size(self.config.firebase.multicast_batch_size))
    }
}
