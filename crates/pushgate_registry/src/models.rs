//! Data types stored and returned by the token registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes attached to a registered device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// The user that currently owns the token
    pub user_id: String,

    /// Free-form platform tag such as "android", "ios" or "web"
    pub platform: String,

    /// Set on every upsert of the token
    pub updated_at: DateTime<Utc>,
}

/// A token together with its metadata, as listed for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub token: String,
    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

/// Snapshot of the registry size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub users: usize,
    pub tokens: usize,
}

/// Why a token left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The client unregistered the token
    Unregistered,
    /// The client replaced the token with a new one
    Superseded,
    /// The provider reported the token as permanently invalid
    Invalid,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Unregistered => "unregistered",
            RemovalReason::Superseded => "superseded",
            RemovalReason::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
