//! Interpreter state types

use std::time::Duration;

/// What the interpreter should do with a command after a hook returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Flow {
    /// The command finished.
    #[default]
    Done,
    /// Suspend until the client sends a line or end-of-input.
    AwaitInput,
    /// Run the text as a script in a nested non-interactive context whose
    /// output becomes this command's output, then finish. The script reads
    /// the command's input and sees its `NAME=value` prefixes.
    Script(String),
    /// Like [`Flow::Script`], but the text was the command's own input
    /// (`... | sh`), so the script runs with nothing left to read.
    InputScript(String),
    /// Wait for the given time, then finish. Interactive contexts suspend
    /// so Ctrl-C can cut the wait short.
    Wait(Duration),
    /// Push a nested interactive shell; the command finishes when it exits.
    Shell,
    /// Terminate the current interpreter context.
    Exit,
}

/// Result of one command hook.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code
    pub exit_code: i32,
    /// What happens next
    pub flow: Flow,
}

impl ExecResult {
    /// Create a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Create a failed result with the given stderr.
    pub fn err(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code,
            ..Self::default()
        }
    }

    /// Create a result with stdout and an explicit exit code.
    pub fn with_code(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code,
            ..Self::default()
        }
    }

    /// Suspend the command until more input arrives.
    pub fn await_input(stdout: impl Into<String>) -> Self {
        Self::ok(stdout).flow(Flow::AwaitInput)
    }

    /// Set the flow.
    pub fn flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    /// Check if the result indicates success.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Session-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Prompt shown, nothing running.
    Idle,
    /// A multi-line statement is being accumulated.
    AwaitingStatement,
    /// A pipeline is running or suspended waiting for input.
    Dispatching,
    /// The session ended; further input is ignored.
    Closed,
}

/// How a run of the pending statement queue ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The queue is empty.
    Idle,
    /// A command is waiting for client input or for its timer.
    Suspended,
    /// A command asked for a nested interactive shell.
    Shell,
    /// The context was told to exit.
    Exit,
}
