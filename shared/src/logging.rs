//! Shared logging utilities for consistent tracing across the orchestrator

use crate::types::LogScope;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Default filter directives for the orchestrator crates at the given level
pub fn default_filter(log_level: &str) -> String {
    format!("capem={log_level},shared={log_level}")
}

/// Initialize the stdout tracing subscriber
///
/// `RUST_LOG` wins over `log_level` when it is set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(base_level)));

    // Ignore the error when a subscriber is already installed (tests, embedding)
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for scope-aware info logging
#[macro_export]
macro_rules! cluster_info {
    ($scope:expr, $($arg:tt)*) => {
        tracing::info!(
            scope = %$scope,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for scope-aware warning logging
#[macro_export]
macro_rules! cluster_warn {
    ($scope:expr, $($arg:tt)*) => {
        tracing::warn!(
            scope = %$scope,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for scope-aware error logging
#[macro_export]
macro_rules! cluster_error {
    ($scope:expr, $($arg:tt)*) => {
        tracing::error!(
            scope = %$scope,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for scope-aware debug logging
#[macro_export]
macro_rules! cluster_debug {
    ($scope:expr, $($arg:tt)*) => {
        tracing::debug!(
            scope = %$scope,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(scope: &LogScope, details: &str) {
    info!(
        scope = %scope,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(scope: &LogScope, reason: &str) {
    info!(
        scope = %scope,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(scope: &LogScope, context: &str, error: &dyn std::fmt::Display) {
    error!(
        scope = %scope,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(scope: &LogScope, message: &str) {
    info!(
        scope = %scope,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        assert_eq!(default_filter("debug"), "capem=debug,shared=debug");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = format_timestamp();
        // HH:MM:SS.mmm
        assert_eq!(ts.len(), 12);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[8..9], ".");
    }

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing(Some("debug"));
        init_tracing(None);
        crate::cluster_info!(LogScope::Orchestrator, "logging initialised");
    }
}
