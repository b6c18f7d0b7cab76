//! Logging configuration
//!
//! Initializes tracing for the application. Output goes to stderr so that
//! stdout carries only command results.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable consulted before `RUST_LOG`
pub const LOG_ENV: &str = "DPE_LOG";

/// Initializes logging with the specified level.
///
/// `DPE_LOG` or `RUST_LOG` override `level` when set. Calling this again is
/// a no-op.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
    }
}
