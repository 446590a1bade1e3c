// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the drivefs crates
//!
//! Usage:
//! - Set DRIVEFS_LOG=off (default) - no logs
//! - Set DRIVEFS_LOG=info - sync and reconciliation summaries
//! - Set DRIVEFS_LOG=debug - every stat/readdir and resolver decision

use std::sync::Once;

// Re-export emit so the macros resolve from any crate
pub use emit;

/// Environment variable holding the minimum log level.
pub const LOG_ENV: &str = "DRIVEFS_LOG";

static INIT: Once = Once::new();

fn level_for(name: &str) -> Option<Option<emit::Level>> {
    match name {
        "off" => Some(None),
        "error" => Some(Some(emit::Level::Error)),
        "warn" => Some(Some(emit::Level::Warn)),
        "info" => Some(Some(emit::Level::Info)),
        "debug" => Some(Some(emit::Level::Debug)),
        _ => None,
    }
}

/// Initialize logging from `DRIVEFS_LOG`.
///
/// Call once at process start; later calls are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let requested = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let level = match level_for(requested.as_str()) {
            Some(None) => return,
            Some(Some(level)) => level,
            None => {
                // Bootstrap notice, the emitter is not running yet
                eprintln!("Warning: Unknown {LOG_ENV} value '{requested}', using 'info'");
                emit::Level::Info
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime lives for the rest of the process
        std::mem::forget(rt);
    });
}

/// Log basic operations (syncs, snapshot loads, batch summaries)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (path lookups, cache hits, edge changes)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable anomalies (dropped edges, stale batches, upstream failures)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log invariant violations
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_level_names() {
        assert!(matches!(level_for("off"), Some(None)));
        assert!(matches!(level_for("warn"), Some(Some(emit::Level::Warn))));
        assert!(matches!(level_for("debug"), Some(Some(emit::Level::Debug))));
        assert!(level_for("verbose").is_none());
    }

    #[test]
    fn test_macros_compile() {
        log_info!("Test message");
        log_debug!("Debug message with {value}", value: 42);
        log_warn!("Warning message");
        log_error!("Error message");
    }
}
