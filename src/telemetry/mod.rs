//! Logging setup
//!
//! Installs a `tracing` fmt subscriber. `RUST_LOG` overrides the configured
//! level; each `-v` raises it one step.

use tracing_subscriber::EnvFilter;

/// Filter directive for a configured level raised by `verbosity` steps
pub fn filter_directive(level: &str, verbosity: u8) -> String {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

    let base = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(level.trim()))
        .unwrap_or(1);
    let index = (base + verbosity as usize).min(LEVELS.len() - 1);

    format!("symptombuddy={}", LEVELS[index])
}

/// Install the global subscriber; later calls are no-ops
pub fn init(level: &str, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
