//! Tracing setup: stderr for the operator, `workflow.log` for the record.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "workflow.log";

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose`. When `logs_dir` is given, events are also
/// appended to `<logs_dir>/workflow.log`; keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(verbose: bool, logs_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).compact();

    let file = logs_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => Some(tracing_appender::non_blocking(
            tracing_appender::rolling::never(dir, LOG_FILE),
        )),
        Err(e) => {
            eprintln!(
                "warning: cannot create log directory {}: {} (file logging disabled)",
                dir.display(),
                e
            );
            None
        }
    });

    match file {
        Some((writer, guard)) => {
            let _ = tracing_subscriber::registry()
                .with(filter(verbose))
                .with(stderr_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter(verbose))
                .with(stderr_layer)
                .try_init();
            None
        }
    }
}
