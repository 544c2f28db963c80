//! Resource limits for emulated sessions
//!
//! These limits keep a hostile client from growing a session without bound:
//! nested interpreter contexts, redirect targets, timers, history and line
//! length are all capped.

use serde::Deserialize;
use std::time::Duration;

/// Resource limits for one session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum depth of nested interpreter contexts (substitutions,
    /// subshells, `sh -c`, nested shells)
    /// Default: 16
    pub max_nesting_depth: usize,

    /// Maximum bytes a single redirect target may receive
    /// Default: 10 MiB
    pub max_file_size: u64,

    /// Longest a timed command may sleep, in seconds
    /// Default: 60
    pub max_sleep_secs: f64,

    /// Maximum number of history entries kept per session
    /// Default: 1000
    pub max_history: usize,

    /// Input lines longer than this are truncated
    /// Default: 64 KiB
    pub max_line_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 16,
            max_file_size: 10 * 1024 * 1024,
            max_sleep_secs: 60.0,
            max_history: 1000,
            max_line_length: 64 * 1024,
        }
    }
}

impl Limits {
    /// Create new limits with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum nesting depth
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set maximum redirect target size
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set maximum sleep duration
    pub fn max_sleep(mut self, duration: Duration) -> Self {
        self.max_sleep_secs = duration.as_secs_f64();
        self
    }

    /// Set maximum history length
    pub fn max_history(mut self, entries: usize) -> Self {
        self.max_history = entries;
        self
    }

    /// Set maximum input line length
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.max_line_length = bytes;
        self
    }

    /// Maximum sleep as a duration.
    pub fn max_sleep_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_sleep_secs.max(0.0))
    }

    /// Check that one more nested context fits, given the current depth.
    pub fn check_nesting(&self, depth: usize) -> Result<(), LimitExceeded> {
        if depth >= self.max_nesting_depth {
            return Err(LimitExceeded::MaxNestingDepth(self.max_nesting_depth));
        }
        Ok(())
    }

    /// Check that a redirect target can grow from `written` by `incoming` bytes.
    pub fn check_file_size(&self, written: u64, incoming: u64) -> Result<(), LimitExceeded> {
        if written.saturating_add(incoming) > self.max_file_size {
            return Err(LimitExceeded::FileSize(self.max_file_size));
        }
        Ok(())
    }
}

/// Error returned when a resource limit is exceeded
///
/// Messages match what a shell prints for the equivalent condition.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LimitExceeded {
    #[error("maximum nesting level exceeded ({0})")]
    MaxNestingDepth(usize),

    #[error("File too large")]
    FileSize(u64),
}
