//! Logger bootstrap for the CLI.
//!
//! Library crates only emit through the `log` facade; the binary decides
//! where records go. Output is stderr so stdout stays clean for reports.

use anyhow::Context;
use flexi_logger::{Logger, LoggerHandle};

/// Environment variable that overrides `--log-level`.
pub const LOG_ENV: &str = "AOTMOD_LOG";

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Start logging to stderr. Keep the handle alive for the life of `main`.
pub fn init(flag_level: &str) -> anyhow::Result<LoggerHandle> {
    let spec = std::env::var(LOG_ENV).unwrap_or_else(|_| normalize_level(flag_level));

    Logger::try_with_str(&spec)
        .with_context(|| format!("invalid log specification `{spec}`"))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .context("failed to start logger")
}

/// Lowercase a bare level name; anything unrecognized falls back to `warn`.
fn normalize_level(level: &str) -> String {
    let lower = level.trim().to_ascii_lowercase();
    if LEVELS.contains(&lower.as_str()) {
        lower
    } else {
        "warn".to_string()
    }
}
