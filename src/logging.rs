//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr once the subscriber is installed.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

/// Build the filter: `RUST_LOG` wins over the configured level.
fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_LEVEL))
}

/// Install a global subscriber appending to `file`.
///
/// With no file, or when the file cannot be opened, logging stays off.
pub fn init(level: &str, file: Option<&Path>) {
    let Some(path) = file else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let log_file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
            return;
        }
    };

    let _ = fmt()
        .with_env_filter(filter(level))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        // Must not panic on a malformed directive
        let _ = filter("not a [valid filter");
    }

    #[test]
    fn init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tnav.log");
        init("debug", Some(&path));
        assert!(path.exists());
    }
}
