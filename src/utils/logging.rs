//! `tracing` subscriber setup.
//!
//! One-shot commands log to stderr. The full-screen chat owns the terminal, so
//! it only logs when given a file.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SCANLENS_LOG";
const DEFAULT_FILTER: &str = "warn";

// Fall back to the default filter if the variable is unset or invalid.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

pub fn init_file(path: &Path) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanlens.log");
        init_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_paths_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_file(&dir.path().join("missing").join("x.log")).is_err());
    }
}
