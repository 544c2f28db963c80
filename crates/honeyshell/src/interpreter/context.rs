//! Interpreter contexts
//!
//! An [`InterpreterContext`] is one shell instance: the login shell, a
//! nested `sh`, a subshell group or a command substitution. Each owns its
//! own copy of the environment and working directory, so nothing a nested
//! context does leaks back into its parent.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use super::pipeline::Pipeline;
use crate::parser::{self, LexError, Statement};
use crate::terminal::Terminal;

pub(crate) struct InterpreterContext {
    pub env: HashMap<String, String>,
    pub cwd: PathBuf,
    /// Talks to a live client: shows prompts, lets commands await input.
    pub interactive: bool,
    /// Where stdout and stderr of the last pipeline stage go.
    pub console: Arc<dyn Terminal>,
    /// Input handed down by an enclosing pipeline or `<` redirection.
    /// The first stage of every pipeline in this context reads it.
    pub stdin: Option<String>,
    /// Statements parsed but not yet dispatched.
    pub pending: VecDeque<Statement>,
    /// Pipeline suspended waiting for client input or a nested shell.
    pub active: Option<Pipeline>,
    /// Lines accumulated while a quote or group is still open.
    pub partial: String,
    /// Number of enclosing contexts.
    pub depth: usize,
}

impl InterpreterContext {
    pub fn new(
        env: HashMap<String, String>,
        cwd: PathBuf,
        interactive: bool,
        console: Arc<dyn Terminal>,
    ) -> Self {
        Self {
            env,
            cwd,
            interactive,
            console,
            stdin: None,
            pending: VecDeque::new(),
            active: None,
            partial: String::new(),
            depth: 0,
        }
    }

    /// A nested context starting from copies of this context's environment,
    /// working directory and input.
    pub fn child(&self, interactive: bool, console: Arc<dyn Terminal>) -> Self {
        Self {
            depth: self.depth + 1,
            stdin: self.stdin.clone(),
            ..Self::new(self.env.clone(), self.cwd.clone(), interactive, console)
        }
    }

    /// Parse a line and queue its statements.
    ///
    /// Returns `Ok(false)` when an interactive context needs another line to
    /// close a quote or group. Any other syntax error discards the whole
    /// pending queue.
    pub fn queue_line(&mut self, line: &str) -> Result<bool, LexError> {
        let text = if self.partial.is_empty() {
            line.to_string()
        } else {
            format!("{}\n{}", std::mem::take(&mut self.partial), line)
        };

        match parser::parse(&text) {
            Ok(statements) => {
                self.pending.extend(statements);
                Ok(true)
            }
            Err(e) if e.is_incomplete() && self.interactive => {
                self.partial = text;
                Ok(false)
            }
            Err(e) => {
                self.pending.clear();
                Err(e)
            }
        }
    }

    /// Whether a multi-line statement is being accumulated.
    pub fn is_continuing(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Drop queued statements and any partial input.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.partial.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::terminal::BufferTerminal;

    fn context(interactive: bool) -> InterpreterContext {
        InterpreterContext::new(
            HashMap::new(),
            PathBuf::from("/root"),
            interactive,
            Arc::new(BufferTerminal::new()),
        )
    }

    #[test]
    fn test_queue_line_splits_statements() {
        let mut ctx = context(true);
        assert!(ctx.queue_line("echo a; echo b").unwrap());
        assert_eq!(ctx.pending.len(), 2);
    }

    #[test]
    fn test_multi_line_accumulation() {
        let mut ctx = context(true);
        assert!(!ctx.queue_line("echo \"one").unwrap());
        assert!(ctx.is_continuing());
        assert!(ctx.queue_line("two\"").unwrap());
        assert!(!ctx.is_continuing());
        assert_eq!(ctx.pending.len(), 1);
        assert_eq!(ctx.pending[0].text, "echo \"one\ntwo\"");
    }

    #[test]
    fn test_non_interactive_unterminated_is_error() {
        let mut ctx = context(false);
        assert_eq!(ctx.queue_line("echo 'x"), Err(LexError::UnterminatedQuote));
        assert!(!ctx.is_continuing());
    }

    #[test]
    fn test_syntax_error_discards_queue() {
        let mut ctx = context(true);
        ctx.queue_line("echo a").unwrap();
        assert!(ctx.queue_line("echo b; ;").is_err());
        assert!(ctx.pending.is_empty());
    }

    #[test]
    fn test_child_copies_state() {
        let mut parent = context(true);
        parent.env.insert("A".into(), "1".into());
        parent.stdin = Some("data\n".into());
        let child = parent.child(false, Arc::new(BufferTerminal::new()));
        assert_eq!(child.depth, 1);
        assert_eq!(child.env.get("A").unwrap(), "1");
        assert_eq!(child.stdin.as_deref(), Some("data\n"));
        assert!(!child.interactive);
    }
}
