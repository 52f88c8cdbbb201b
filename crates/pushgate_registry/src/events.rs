//! Registry events and the observer interface that receives them.
//!
//! The registry never logs on its own. Every successful mutation produces a
//! [`RegistryEvent`] which is handed to the injected [`RegistryObserver`]
//! after the registry lock has been released.

use tracing::{debug, info};

use crate::models::RemovalReason;

/// A change applied to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A token was seen for the first time
    Registered {
        user_id: String,
        token: String,
        platform: String,
    },
    /// A known token was upserted again by its owner
    Refreshed {
        user_id: String,
        token: String,
        platform: String,
    },
    /// A known token was upserted by a different user
    Transferred {
        token: String,
        from_user_id: String,
        to_user_id: String,
        platform: String,
    },
    /// A token was removed from the registry
    Removed {
        user_id: String,
        token: String,
        reason: RemovalReason,
    },
}

impl RegistryEvent {
    /// Short log message for the event.
    pub fn summary(&self) -> &'static str {
        match self {
            RegistryEvent::Registered { .. } => "token registered",
            RegistryEvent::Refreshed { .. } => "token refreshed",
            RegistryEvent::Transferred { .. } => "token transferred",
            RegistryEvent::Removed { .. } => "token removed",
        }
    }
}

/// Receives registry events.
///
/// Implementations must be cheap; they run on the caller's task right after
/// each mutation.
pub trait RegistryObserver: Send + Sync {
    fn on_event(&self, event: &RegistryEvent);
}

/// Forwards registry events to `tracing` as structured events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RegistryObserver for TracingObserver {
    fn on_event(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::Registered {
                user_id,
                token,
                platform,
            } => info!(
                user_id = %user_id,
                token = %token_hint(token),
                platform = %platform,
                "{}",
                event.summary()
            ),
            RegistryEvent::Refreshed {
                user_id,
                token,
                platform,
            } => debug!(
                user_id = %user_id,
                token = %token_hint(token),
                platform = %platform,
                "{}",
                event.summary()
            ),
            RegistryEvent::Transferred {
                token,
                from_user_id,
                to_user_id,
                platform,
            } => info!(
                from_user_id = %from_user_id,
                to_user_id = %to_user_id,
                token = %token_hint(token),
                platform = %platform,
                "{}",
                event.summary()
            ),
            RegistryEvent::Removed {
                user_id,
                token,
                reason,
            } => info!(
                user_id = %user_id,
                token = %token_hint(token),
                reason = %reason,
                "{}",
                event.summary()
            ),
        }
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RegistryObserver for NoopObserver {
    fn on_event(&self, _event: &RegistryEvent) {}
}

/// Last eight characters of a token, enough to correlate log lines.
pub fn token_hint(token: &str) -> &str {
    let start = token
        .char_indices()
        .rev()
        .nth(7)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &token[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hint_keeps_last_eight_chars() {
        assert_eq!(token_hint("abcdefghijklmnop"), "ijklmnop");
        assert_eq!(token_hint("short"), "short");
        assert_eq!(token_hint(""), "");
    }

    #[test]
    fn test_token_hint_respects_char_boundaries() {
        let token = "ä".repeat(10);
        assert_eq!(token_hint(&token), "ä".repeat(8));
    }

    #[test]
    fn test_removal_summary_does_not_depend_on_reason() {
        for reason in [
            RemovalReason::Unregistered,
            RemovalReason::Superseded,
            RemovalReason::Invalid,
        ] {
            let event = RegistryEvent::Removed {
                user_id: "u1".to_string(),
                token: "t1".to_string(),
                reason,
            };
            assert_eq!(event.summary(), "token removed");
        }
    }

    #[test]
    fn test_registration_summaries() {
        let registered = RegistryEvent::Registered {
            user_id: "u1".to_string(),
            token: "t1".to_string(),
            platform: "ios".to_string(),
        };
        let transferred = RegistryEvent::Transferred {
            token: "t1".to_string(),
            from_user_id: "u1".to_string(),
            to_user_id: "u2".to_string(),
            platform: "ios".to_string(),
        };

        assert_eq!(registered.summary(), "token registered");
        assert_eq!(transferred.summary(), "token transferred");
    }
}
