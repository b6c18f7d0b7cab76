//! Infrastructure layer
//!
//! Process-level concerns: configuration and logging.

mod config;
mod logging;

pub use config::{Config, ConfigError};
pub use logging::{LOG_ENV, init_logging};
