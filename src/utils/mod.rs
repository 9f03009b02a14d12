//! Process-level utilities

pub mod env;
pub mod logging;
pub mod signal;

pub use env::{env_int, env_opt};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
pub use signal::{create_shutdown_receiver, wait_for_shutdown_signal};
