//! Push-notification fan-out over Firebase Cloud Messaging
//!
//! This crate resolves application users to their registered device tokens,
//! sends data-only messages through a [`PushProvider`] and removes tokens the
//! provider reports as permanently invalid.
//!
//! # Features
//!
//! - Sending to all devices of a user, batched per multicast call
//! - Sending to a single device token
//! - Normalising JSON payload values to the string-only FCM data channel
//! - Cleanup of unregistered and malformed tokens after a multicast send
//! - An FCM HTTP v1 client authenticated with a service account key
//! - Axum handlers for registration, update, unregistration and sending
//!
//! # Example
//!
//! ```rust,no_run
//! use pushgate_config::AppConfig;
//! use pushgate_firebase::routes;
//! use std::sync::Arc;
//!
//! fn setup_app() -> Result<axum::Router, pushgate_firebase::ProviderError> {
//!     let config = Arc::new(AppConfig::default());
//!     routes(config)
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /push/register` - Register a token for a user
//! - `POST /push/update` - Replace a user's token
//! - `POST /push/unregister` - Remove a user's token
//! - `POST /push/send-to-user` - Send data to every device of a user
//! - `POST /push/send-to-token` - Send data to one device
//! - `GET /push/users/{user_id}/tokens` - List a user's registrations
//! - `GET /health` - Liveness and registry size

pub mod auth;
pub mod client;
pub mod error;
pub mod handlers;
pub mod payload;
pub mod provider;
pub mod routes;
pub mod service;

pub use client::FirebaseClient;
pub use error::{ProviderError, PushError};
pub use payload::{normalize_payload, Payload, PayloadValue};
pub use provider::{ErrorCode, Priority, PushProvider, SendOptions, SendOutcome};
pub use routes::{router, routes};
pub use service::{DispatchService, DispatchSummary, PushServiceFactory};
