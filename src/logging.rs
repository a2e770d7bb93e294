//! Structured logging setup (ambient stack) plus the slow/hung request
//! watchdog described in spec §5/§7: a soft deadline that only ever logs,
//! never cancels the in-flight pipeline.

use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a `tracing-subscriber` fmt layer honoring `RUST_LOG`, falling
/// back to `config.log_level` when the environment variable is unset.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Spawns a watchdog that logs at `slow_request_ms`/`hung_request_ms`
/// past `start`, at the configured level, then returns. Never aborts or
/// races the caller's own work — call `handle.abort()` once the request
/// completes to silence it.
pub fn watch_request(
    request_name: &'static str,
    slow_ms: u64,
    hung_ms: u64,
    level: RequestLogLevel,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if slow_ms > 0 {
            tokio::time::sleep(Duration::from_millis(slow_ms)).await;
            log_at(level, request_name, "slow_request_ms", slow_ms);
        }
        if hung_ms > slow_ms {
            tokio::time::sleep(Duration::from_millis(hung_ms - slow_ms)).await;
            log_at(level, request_name, "hung_request_ms", hung_ms);
        }
    })
}

#[derive(Debug, Clone, Copy)]
pub enum RequestLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl RequestLogLevel {
    pub fn parse(level: &str) -> Self {
        match level {
            "trace" => RequestLogLevel::Trace,
            "debug" => RequestLogLevel::Debug,
            "warn" => RequestLogLevel::Warn,
            "error" => RequestLogLevel::Error,
            _ => RequestLogLevel::Info,
        }
    }
}

fn log_at(level: RequestLogLevel, request_name: &str, threshold_name: &str, threshold_ms: u64) {
    match level {
        RequestLogLevel::Trace => tracing::trace!(request = request_name, threshold_name, threshold_ms, "request exceeded threshold"),
        RequestLogLevel::Debug => tracing::debug!(request = request_name, threshold_name, threshold_ms, "request exceeded threshold"),
        RequestLogLevel::Info => tracing::info!(request = request_name, threshold_name, threshold_ms, "request exceeded threshold"),
        RequestLogLevel::Warn => tracing::warn!(request = request_name, threshold_name, threshold_ms, "request exceeded threshold"),
        RequestLogLevel::Error => tracing::error!(request = request_name, threshold_name, threshold_ms, "request exceeded threshold"),
    }
}
