//! Logging utilities for structured tracing

use crate::error::DirectoryError;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_directory=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        // stdout belongs to the tool protocol
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Times one refresh step and logs its duration when dropped
pub struct Timer {
    start: Instant,
    step: &'static str,
}

impl Timer {
    pub fn new(step: &'static str) -> Self {
        Self {
            start: Instant::now(),
            step,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::debug!(
            step = self.step,
            duration_ms = self.elapsed().as_millis() as u64,
            "Refresh step finished"
        );
    }
}

/// Log a directory failure; startup-fatal errors at `error`, the rest at `warn`
pub fn log_error(step: &str, error: &DirectoryError) {
    let fatal = error.is_fatal_at_startup();
    if fatal {
        tracing::error!(step = %step, error = %error, fatal, "Directory step failed");
    } else {
        tracing::warn!(step = %step, error = %error, fatal, "Directory step failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timer_tracks_duration() {
        let timer = Timer::new("refresh_users");
        thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        assert_eq!(timer.step, "refresh_users");
    }
}
