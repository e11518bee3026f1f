use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::{fmt, prelude::*};

use aegis_vault::storage::{data_dir, ensure_dir, load_config, log_dir};

const DEFAULT_LOG_FILTER: LevelFilter = LevelFilter::INFO;
const LOG_FILTER_ENV: &str = "AEGIS_LOG";

fn main() -> anyhow::Result<()> {
    let _guard = init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting aegis");

    let result = aegis_vault::app::run();
    if let Err(e) = &result {
        tracing::error!(error = %e, "aegis stopped with an error");
    }
    result
}

// The terminal belongs to the UI, so logs only ever go to a file.
fn init_logging() -> Option<WorkerGuard> {
    let dir = load_config().and_then(|cfg| data_dir(&cfg)).ok()?;
    let log_dir = log_dir(&dir);
    ensure_dir(&log_dir).ok()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(31)
        .filename_prefix("aegis")
        .filename_suffix("log")
        .build(&log_dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let level = env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|raw| raw.parse::<LevelFilter>().ok())
        .unwrap_or(DEFAULT_LOG_FILTER);
    let filter = Targets::new().with_default(level);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(layer).try_init().ok()?;
    Some(guard)
}
