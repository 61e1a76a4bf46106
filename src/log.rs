// src/log.rs
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::uptime;

use crate::config::consts::LOG_FILE;
use crate::file::ensure_directory;

#[doc(hidden)]
pub use tracing as __tracing;

/// Install the file logger at `<dir>/debug.log`.
///
/// `RUST_LOG` wins over `default_level` when set. Calling this more than once
/// (tests, embedding) keeps the first subscriber and returns the path anyway.
pub fn init(dir: &Path, default_level: &str) -> io::Result<PathBuf> {
    ensure_directory(dir)?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(uptime())
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(path)
}

/// Info-level logging
#[macro_export]
macro_rules! logf {
    ($($arg:tt)*) => {
        $crate::log::__tracing::info!($($arg)*)
    };
}

/// Debug-level logging
#[macro_export]
macro_rules! logd {
    ($($arg:tt)*) => {
        $crate::log::__tracing::debug!($($arg)*)
    };
}

/// Warn-level logging
#[macro_export]
macro_rules! logw {
    ($($arg:tt)*) => {
        $crate::log::__tracing::warn!($($arg)*)
    };
}

/// Error-level logging
#[macro_export]
macro_rules! loge {
    ($($arg:tt)*) => {
        $crate::log::__tracing::error!($($arg)*)
    };
}
