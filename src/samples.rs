//! Shared setup for the sample binaries.

use std::env;

use tracing_subscriber::EnvFilter;

/// Logs to stderr, filtered by `RUST_LOG` (default `warn`), so stdout only
/// carries the agent's answer.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command-line arguments joined into a prompt, or `default` when none are given.
pub fn prompt_from_args(default: &str) -> String {
    let prompt = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        default.to_string()
    } else {
        prompt
    }
}
