// --- File: crates/pushgate_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level for the `pushgate` targets, overridden by `RUST_LOG`.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

// --- Firebase Cloud Messaging Config ---
// key_path may be set to "secret_from_env" to read it from FIREBASE_KEY_PATH.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub key_path: Option<String>,
    pub api_base_url: String,
    /// Platform tag stored for registrations that do not name one.
    pub default_platform: String,
    /// Upper bound of tokens per multicast call.
    pub multicast_batch_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            key_path: None,
            api_base_url: "https://fcm.googleapis.com".to_string(),
            default_platform: "unknown".to_string(),
            multicast_batch_size: 500,
            request_timeout_secs: 10,
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
}
