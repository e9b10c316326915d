//! Logging setup shared by every subcommand.
//!
//! Logs go to a daily-rolling file under `~/.switchboard/logs/` and, unless
//! running as a hook, to stderr. `SWITCHBOARD_DEBUG_LOG=1` forces debug level;
//! otherwise `RUST_LOG` applies (default `info`).

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber. Keep the returned guard alive for the
/// whole process or buffered file output is lost.
pub fn init(logs_dir: &Path, to_stderr: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match file_appender(logs_dir) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let stderr_layer = to_stderr.then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

fn filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled() -> bool {
    env::var("SWITCHBOARD_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn file_appender(logs_dir: &Path) -> Option<RollingFileAppender> {
    if fs_err::create_dir_all(logs_dir).is_err() {
        return None;
    }
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("switchboard")
        .filename_suffix("log")
        .build(logs_dir)
        .ok()
}
