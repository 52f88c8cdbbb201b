//! The in-memory token registry.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::events::{RegistryEvent, RegistryObserver, TracingObserver};
use crate::models::{Registration, RegistryStats, RemovalReason, TokenMetadata};

/// Both indexes, always mutated together under one lock.
#[derive(Debug, Default)]
struct Indexes {
    user_tokens: HashMap<String, BTreeSet<String>>,
    metadata: HashMap<String, TokenMetadata>,
}

impl Indexes {
    /// Drops `token` from the user's set, deleting the user entry once empty.
    fn detach(&mut self, user_id: &str, token: &str) -> bool {
        let Some(tokens) = self.user_tokens.get_mut(user_id) else {
            return false;
        };
        let removed = tokens.remove(token);
        if tokens.is_empty() {
            self.user_tokens.remove(user_id);
        }
        removed
    }

    fn upsert(&mut self, user_id: &str, token: &str, platform: String) -> RegistryEvent {
        let metadata = TokenMetadata {
            user_id: user_id.to_string(),
            platform: platform.clone(),
            updated_at: Utc::now(),
        };
        let previous = self.metadata.insert(token.to_string(), metadata);

        self.user_tokens
            .entry(user_id.to_string())
            .or_default()
            .insert(token.to_string());

        match previous {
            Some(previous) if previous.user_id != user_id => {
                self.detach(&previous.user_id, token);
                RegistryEvent::Transferred {
                    token: token.to_string(),
                    from_user_id: previous.user_id,
                    to_user_id: user_id.to_string(),
                    platform,
                }
            }
            Some(_) => RegistryEvent::Refreshed {
                user_id: user_id.to_string(),
                token: token.to_string(),
                platform,
            },
            None => RegistryEvent::Registered {
                user_id: user_id.to_string(),
                token: token.to_string(),
                platform,
            },
        }
    }

    fn remove(&mut self, user_id: &str, token: &str, reason: RemovalReason) -> Option<RegistryEvent> {
        let was_member = self.detach(user_id, token);
        let metadata = self.metadata.remove(token);

        // The metadata owner may differ from the caller; its set must not keep the token.
        if let Some(metadata) = &metadata {
            if metadata.user_id != user_id {
                self.detach(&metadata.user_id, token);
            }
        }

        if !was_member && metadata.is_none() {
            return None;
        }

        Some(RegistryEvent::Removed {
            user_id: metadata
                .map(|metadata| metadata.user_id)
                .unwrap_or_else(|| user_id.to_string()),
            token: token.to_string(),
            reason,
        })
    }
}

/// Volatile, process-local index of which device tokens belong to which user.
///
/// The registry keeps two indexes in lock-step: user to tokens, and token to
/// [`TokenMetadata`]. Every public operation takes the single internal lock
/// once, so concurrent callers never observe one index updated without the
/// other. The lock is never held while calling the observer.
///
/// A token has at most one owner. Upserting a known token under another user
/// moves it: the previous owner's set loses the token in the same step.
pub struct TokenRegistry {
    indexes: Mutex<Indexes>,
    default_platform: String,
    observer: Arc<dyn RegistryObserver>,
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("default_platform", &self.default_platform)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TokenRegistry {
    /// Creates an empty registry that reports events through `tracing`.
    pub fn new(default_platform: impl Into<String>) -> Self {
        Self::with_observer(default_platform, Arc::new(TracingObserver))
    }

    /// Creates an empty registry with a custom event observer.
    pub fn with_observer(
        default_platform: impl Into<String>,
        observer: Arc<dyn RegistryObserver>,
    ) -> Self {
        Self {
            indexes: Mutex::new(Indexes::default()),
            default_platform: default_platform.into(),
            observer,
        }
    }

    /// The platform tag used when a registration names none.
    pub fn default_platform(&self) -> &str {
        &self.default_platform
    }

    fn lock(&self) -> MutexGuard<'_, Indexes> {
        // The indexes are consistent after every completed mutation, so a
        // poisoned lock still guards valid state.
        self.indexes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn platform_or_default(&self, platform: Option<&str>) -> String {
        platform
            .filter(|platform| !platform.is_empty())
            .unwrap_or(self.default_platform.as_str())
            .to_string()
    }

    fn emit(&self, event: RegistryEvent) {
        self.observer.on_event(&event);
    }

    /// Registers `token` for `user_id`, or refreshes it if already registered.
    ///
    /// Repeating a call with identical arguments only refreshes `updated_at`.
    /// A missing platform falls back to the default platform.
    pub fn upsert(&self, user_id: &str, token: &str, platform: Option<&str>) {
        let platform = self.platform_or_default(platform);
        let event = self.lock().upsert(user_id, token, platform);
        self.emit(event);
    }

    /// Removes `token` from `user_id` and deletes its metadata.
    ///
    /// The metadata is deleted even if another user owns the token. Absent
    /// tokens are ignored.
    pub fn remove(&self, user_id: &str, token: &str) {
        self.remove_with_reason(user_id, token, RemovalReason::Unregistered);
    }

    /// Same as [`TokenRegistry::remove`], recording why the token left.
    pub fn remove_with_reason(&self, user_id: &str, token: &str, reason: RemovalReason) {
        let event = self.lock().remove(user_id, token, reason);
        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Replaces `old_token` with `token` for `user_id` in one atomic step.
    ///
    /// When `old_token` is absent or equal to `token` this is a plain upsert.
    pub fn replace(
        &self,
        user_id: &str,
        old_token: Option<&str>,
        token: &str,
        platform: Option<&str>,
    ) {
        let platform = self.platform_or_default(platform);
        let events = {
            let mut indexes = self.lock();
            let removed = old_token
                .filter(|old_token| *old_token != token)
                .and_then(|old_token| {
                    indexes.remove(user_id, old_token, RemovalReason::Superseded)
                });
            let upserted = indexes.upsert(user_id, token, platform);
            [removed, Some(upserted)]
        };

        for event in events.into_iter().flatten() {
            self.emit(event);
        }
    }

    /// Snapshot of the tokens owned by `user_id`; empty for unknown users.
    pub fn tokens_of(&self, user_id: &str) -> BTreeSet<String> {
        self.lock()
            .user_tokens
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Metadata of `token`, if registered.
    pub fn metadata_of(&self, token: &str) -> Option<TokenMetadata> {
        self.lock().metadata.get(token).cloned()
    }

    /// All registrations of `user_id`, ordered by token.
    pub fn registrations_of(&self, user_id: &str) -> Vec<Registration> {
        let indexes = self.lock();
        let Some(tokens) = indexes.user_tokens.get(user_id) else {
            return Vec::new();
        };

        tokens
            .iter()
            .filter_map(|token| {
                indexes.metadata.get(token).map(|metadata| Registration {
                    token: token.clone(),
                    metadata: metadata.clone(),
                })
            })
            .collect()
    }

    /// Whether the registry holds an entry for `user_id`.
    pub fn contains_user(&self, user_id: &str) -> bool {
        self.lock().user_tokens.contains_key(user_id)
    }

    pub fn stats(&self) -> RegistryStats {
        let indexes = self.lock();
        RegistryStats {
            users: indexes.user_tokens.len(),
            tokens: indexes.metadata.len(),
        }
    }

    /// Checks that both indexes describe the same relation.
    ///
    /// Used by tests; cheap enough for debug assertions elsewhere.
    pub fn is_consistent(&self) -> bool {
        let indexes = self.lock();

        let memberships: usize = indexes.user_tokens.values().map(BTreeSet::len).sum();
        if memberships != indexes.metadata.len() {
            return false;
        }

        indexes.user_tokens.iter().all(|(user_id, tokens)| {
            !tokens.is_empty()
                && tokens.iter().all(|token| {
                    indexes
                        .metadata
                        .get(token)
                        .is_some_and(|metadata| &metadata.user_id == user_id)
                })
        })
    }
}
