//! Process-level helpers shared by the binary and the server

pub mod env;
pub mod logging;
pub mod signal;

pub use env::env_opt;
pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use signal::wait_for_shutdown_signal;
