//! Device token registry for Pushgate.
//!
//! The registry maps application users to the push tokens of their devices
//! and keeps per-token metadata (owner, platform, last update). It lives in
//! process memory only; restarting the gateway discards every registration.
//!
//! # Example
//!
//! ```
//! use pushgate_registry::TokenRegistry;
//!
//! let registry = TokenRegistry::new("unknown");
//! registry.upsert("user-1", "device-token-a", Some("android"));
//!
//! assert!(registry.tokens_of("user-1").contains("device-token-a"));
//! assert_eq!(registry.metadata_of("device-token-a").unwrap().user_id, "user-1");
//!
//! registry.remove("user-1", "device-token-a");
//! assert!(registry.tokens_of("user-1").is_empty());
//! ```

pub mod events;
pub mod models;
pub mod registry;

pub use events::{NoopObserver, RegistryEvent, RegistryObserver, TracingObserver};
pub use models::{Registration, RegistryStats, RemovalReason, TokenMetadata};
pub use registry::TokenRegistry;
