//! Configuration loading for Pushgate.
//!
//! Sources are layered in this order, later ones winning:
//!
//! 1. `{CONFIG_DIR}/default.*`
//! 2. `{CONFIG_DIR}/{RUN_ENV}.*`
//! 3. environment variables prefixed with `PUSHGATE` and separated by `__`
//!    (e.g. `PUSHGATE__SERVER__PORT=9000`)
//!
//! Any string value equal to `secret_from_env` is then replaced by the
//! environment variable named after its upper-cased path, so
//! `firebase.key_path = "secret_from_env"` reads `FIREBASE_KEY_PATH`.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::env;
use std::path::Path;
use tracing::{debug, warn};

pub mod models;
pub use models::*;

/// Marker value replaced by an environment variable at load time.
pub const SECRET_MARKER: &str = "secret_from_env";

/// Prefix for configuration environment variables.
pub const DEFAULT_PREFIX: &str = "PUSHGATE";

/// Loads the configuration from the directory named by `CONFIG_DIR`
/// (default `config`) and the environment named by `RUN_ENV` (default `debug`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());

    load_config_from(Path::new(&config_dir), &run_env)
}

/// Loads the configuration from an explicit directory and run environment.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, ConfigError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);

    debug!(
        default_path = %default_path.display(),
        env_path = %env_path.display(),
        "loading configuration"
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(DEFAULT_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Recursively replaces all `secret_from_env` string values with environment variable values.
fn inject_env_secrets(value: &mut Value) {
    fn walk(path: Vec<String>, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let env_key = path.join("_").to_uppercase();
                match env::var(&env_key) {
                    Ok(env_val) => *obj = Value::String(env_val),
                    Err(_) => warn!(env_key = %env_key, "env var not found for secret_from_env"),
                }
            }
            _ => {}
        }
    }

    walk(vec![], value);
}

/// Applies environment overrides based on `secret_from_env` markers in the serialized config.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    inject_env_secrets(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to apply env secrets: {err}")))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file once per process.
///
/// The file is taken from `DOTENV_OVERRIDE`, then from the first command line
/// argument if it starts with `.env`, and defaults to `.env`. Returns the path used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_sources() {
        let dir = env::temp_dir().join("pushgate-config-test-missing");
        let config = load_config_from(&dir, "nowhere").expect("defaults should load");

        assert_eq!(config.server.port, 8086);
        assert_eq!(config.firebase.default_platform, "unknown");
        assert_eq!(config.firebase.multicast_batch_size, 500);
        assert!(config.firebase.project_id.is_none());
    }

    #[test]
    fn test_run_env_file_overrides_default_file() {
        let dir = env::temp_dir().join(format!("pushgate-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            "[server]\nport = 9000\n\n[firebase]\nproject_id = \"demo\"\ndefault_platform = \"android\"\n",
        )
        .unwrap();
        fs::write(dir.join("staging.toml"), "[server]\nport = 9100\n").unwrap();

        let config = load_config_from(&dir, "staging").expect("config should load");

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.firebase.project_id.as_deref(), Some("demo"));
        assert_eq!(config.firebase.default_platform, "android");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_secret_marker_is_replaced_from_env() {
        env::set_var("FIREBASE_KEY_PATH", "/run/secrets/fcm.json");
        let mut config = AppConfig::default();
        config.firebase.key_path = Some(SECRET_MARKER.to_string());

        let config = apply_env_overrides_from_marker(config).unwrap();

        assert_eq!(
            config.firebase.key_path.as_deref(),
            Some("/run/secrets/fcm.json")
        );
    }
}
