// --- File: crates/pushgate_common/src/lib.rs ---

// Shared building blocks used by every Pushgate crate:
// error-to-HTTP mapping and logging initialisation.
pub mod error;
pub mod logging;

pub use error::{error_response, GatewayError, HttpStatusCode};
pub use logging::{init, init_with_config, init_with_level, log_error};
