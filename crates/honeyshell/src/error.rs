//! Error types for Honeyshell
//!
//! Every error here is eventually rendered to the attacker-visible terminal
//! the way bash would print it, so the `Display` text is the shell message
//! without the `-bash: ` prefix. Nothing in this module terminates a session.

use crate::limits::LimitExceeded;
use crate::parser::LexError;
use thiserror::Error;

/// Result type alias using Honeyshell's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Honeyshell error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Tokenizer or statement-splitting failure.
    ///
    /// The pending statement queue is discarded when this surfaces.
    #[error("{0}")]
    Syntax(#[from] LexError),

    /// Command name did not resolve through the command table.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// A redirection target could not be opened.
    #[error("{path}: {reason}")]
    Redirection { path: String, reason: String },

    /// A write pushed a redirect target past its size quota.
    #[error("{path}: {source}")]
    Quota {
        path: String,
        #[source]
        source: LimitExceeded,
    },

    /// I/O error from filesystem operations.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Error raised by a command emulation.
    #[error("{0}")]
    Execution(String),

    /// Internal error for unexpected failures.
    ///
    /// The message is safe to show; it never carries host paths or panic text.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a redirection error for `path`.
    pub fn redirection(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Redirection {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Render the error the way bash prints it on the terminal.
    pub fn shell_message(&self) -> String {
        format!("-bash: {}\n", self)
    }
}

/// Map an I/O error kind to the strerror text a Linux shell would print.
pub(crate) fn io_reason(err: &Error) -> &'static str {
    match err {
        Error::Io(io) => match io.kind() {
            std::io::ErrorKind::NotFound => "No such file or directory",
            std::io::ErrorKind::AlreadyExists => "File exists",
            std::io::ErrorKind::PermissionDenied => "Permission denied",
            std::io::ErrorKind::NotADirectory => "Not a directory",
            std::io::ErrorKind::IsADirectory => "Is a directory",
            _ => "Input/output error",
        },
        _ => "Input/output error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_not_found_message() {
        let err = Error::CommandNotFound("foo".to_string());
        assert_eq!(err.shell_message(), "-bash: foo: command not found\n");
    }

    #[test]
    fn test_redirection_message() {
        let err = Error::redirection("/nope/file", "No such file or directory");
        assert_eq!(
            err.shell_message(),
            "-bash: /nope/file: No such file or directory\n"
        );
    }

    #[test]
    fn test_io_reason_not_found() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io_reason(&err), "No such file or directory");
    }
}
