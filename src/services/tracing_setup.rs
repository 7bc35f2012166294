//! Tracing subscriber setup
//!
//! Shared by the binary and the tests: events go to a log file, filtered by
//! `RUST_LOG` or the configured level, and WARN+ events are mirrored to the
//! status pane.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use super::status_log::{self, StatusLogHandle, StatusLogLayer};

/// Install the global subscriber logging to `log_file_path`.
///
/// Returns `None` if the log file cannot be created or a subscriber is
/// already installed.
pub fn init_global(log_file_path: &Path, level: &str) -> Option<StatusLogHandle> {
    let log_file = File::create(log_file_path).ok()?;
    let (status_layer, status_handle) = status_log::create();

    build_subscriber(log_file, level, Some(status_layer))
        .try_init()
        .ok()?;

    Some(status_handle)
}

/// Filter from `RUST_LOG`, falling back to `level` (then `debug`)
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("debug"))
}

pub fn build_subscriber(
    log_file: File,
    level: &str,
    status_layer: Option<StatusLogLayer>,
) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter(level))
        .with(status_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_events_reach_file_and_status() {
        let log_file = NamedTempFile::new().unwrap();
        let (layer, handle) = status_log::create();
        let subscriber = build_subscriber(log_file.reopen().unwrap(), "info", Some(layer));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("too verbose");
            tracing::info!("Sending \"help\" on serial");
            tracing::warn!("Completion for \"board\" not found, completion disabled");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("Sending \"help\" on serial"));
        assert!(!contents.contains("too verbose"));

        let messages = handle.drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("completion disabled"));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap(), "not a [level", None);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("still logged");
        });
        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("still logged"));
    }
}
