//! Emulated shell sessions
//!
//! A [`Session`] is one attacker connection: a stack of interpreter
//! contexts (the login shell at the bottom, nested interactive shells on
//! top), the line editor and its history, and the session state. The
//! transport feeds it either whole lines ([`Session::line_received`]) or
//! raw keystrokes ([`Session::data_received`]).
//!
//! A `sleep` at an interactive prompt does not block the session: it
//! leaves a [`Session::deadline`] and the transport calls
//! [`Session::timer_expired`] when it passes, so Ctrl-C can arrive first.

mod completion;
mod editor;
mod keys;

pub use keys::{Key, decode};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use completion::{Completion, complete, format_columns};
use editor::LineEditor;

use crate::commands::{Command, CommandFactory, CommandTable};
use crate::config::Config;
use crate::error::Error;
use crate::events::{Event, EventSink, TracingEventSink};
use crate::fs::{FileSystem, InMemoryFs};
use crate::interpreter::{
    InterpreterContext, Outcome, Pipeline, PipelineEvent, Runtime, SessionState,
};
use crate::terminal::Terminal;
use tokio::time::Instant;

/// One emulated shell session.
pub struct Session {
    runtime: Runtime,
    terminal: Arc<dyn Terminal>,
    root: InterpreterContext,
    /// Nested interactive shells; the last one is active.
    nested: Vec<InterpreterContext>,
    state: SessionState,
    editor: LineEditor,
}

/// The active (innermost) context.
fn top<'a>(
    root: &'a mut InterpreterContext,
    nested: &'a mut [InterpreterContext],
) -> &'a mut InterpreterContext {
    match nested.last_mut() {
        Some(ctx) => ctx,
        None => root,
    }
}

impl Session {
    /// Create a new SessionBuilder for customized configuration.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Working directory of the active context.
    pub fn cwd(&self) -> &Path {
        &self.current().cwd
    }

    /// Look up a variable in the active context.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.current().env.get(name).map(String::as_str)
    }

    /// Number of nested interactive shells.
    pub fn depth(&self) -> usize {
        self.nested.len()
    }

    /// Lines entered so far, oldest first.
    pub fn history(&self) -> &[String] {
        self.editor.history()
    }

    pub fn config(&self) -> &Config {
        &self.runtime.config
    }

    /// When the running command's timed wait (`sleep`) ends.
    ///
    /// The transport should call [`Session::timer_expired`] once this
    /// instant has passed, unless input arrives first.
    pub fn deadline(&self) -> Option<Instant> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.current().active.as_ref().and_then(Pipeline::deadline)
    }

    /// Finish the running command's timed wait if its deadline has passed.
    pub async fn timer_expired(&mut self) {
        match self.deadline() {
            Some(deadline) if deadline <= Instant::now() => {}
            _ => return,
        }
        let Session { runtime, root, nested, .. } = self;
        let outcome = runtime.resume(top(root, nested), PipelineEvent::Timer).await;
        self.settle(outcome).await;
    }

    fn current(&self) -> &InterpreterContext {
        self.nested.last().unwrap_or(&self.root)
    }

    fn current_mut(&mut self) -> &mut InterpreterContext {
        top(&mut self.root, &mut self.nested)
    }

    /// The prompt for the active context.
    pub fn prompt(&self) -> String {
        let ctx = self.current();
        if ctx.is_continuing() {
            return "> ".to_string();
        }
        let config = &self.runtime.config;
        let home = config.home_dir();
        let cwd = ctx.cwd.to_string_lossy();
        let shown = match cwd.strip_prefix(home.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{}", rest),
            _ => cwd.to_string(),
        };
        let sigil = if config.is_root() { '#' } else { '$' };
        format!("{}@{}:{}{} ", config.username, config.hostname, shown, sigil)
    }

    /// Write the prompt if the active context is interactive.
    pub fn show_prompt(&self) {
        if self.state != SessionState::Closed && self.current().interactive {
            self.terminal.write(self.prompt().as_bytes());
        }
    }

    /// A complete line arrived from the client.
    pub async fn line_received(&mut self, line: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        let line = truncate(line, self.runtime.config.limits.max_line_length);

        let Session {
            runtime,
            root,
            nested,
            editor,
            ..
        } = self;
        let ctx = top(root, nested);

        // Typed ahead during a timed wait: runs once the wait is over
        if ctx.active.as_ref().is_some_and(|p| p.deadline().is_some()) {
            if ctx.interactive {
                editor.push_history(line);
            }
            if let Err(e) = ctx.queue_line(line) {
                ctx.console
                    .error_write(Error::Syntax(e).shell_message().as_bytes());
            }
            return;
        }

        if ctx.active.is_some() {
            let outcome = runtime
                .resume(ctx, PipelineEvent::Line(line.to_string()))
                .await;
            self.settle(outcome).await;
            return;
        }

        if ctx.interactive {
            editor.push_history(line);
        }
        match ctx.queue_line(line) {
            Ok(true) => {
                self.state = SessionState::Dispatching;
                let outcome = runtime.drive(ctx).await;
                self.settle(outcome).await;
            }
            Ok(false) => {
                self.state = SessionState::AwaitingStatement;
                self.show_prompt();
            }
            Err(e) => {
                tracing::debug!(error = %e, "syntax error");
                ctx.console
                    .error_write(Error::Syntax(e).shell_message().as_bytes());
                self.settle(Outcome::Idle).await;
            }
        }
    }

    /// Raw bytes arrived from a character-mode client.
    pub async fn data_received(&mut self, data: &[u8]) {
        for key in decode(data) {
            self.key_received(key).await;
        }
    }

    /// Handle one keystroke.
    pub async fn key_received(&mut self, key: Key) {
        if self.state == SessionState::Closed {
            return;
        }
        let echo = match key {
            Key::Char(c) => self.editor.insert(c),
            Key::Backspace => self.editor.backspace(),
            Key::Delete => self.editor.delete(),
            Key::Left => self.editor.move_left(),
            Key::Right => self.editor.move_right(),
            Key::Home => self.editor.move_home(),
            Key::End => self.editor.move_end(),
            Key::Up => self.editor.history_up(),
            Key::Down => self.editor.history_down(),
            Key::KillToEnd => self.editor.kill_to_end(),
            Key::KillToStart => self.editor.kill_to_start(),
            Key::ClearScreen => {
                self.terminal.write(b"\x1b[H\x1b[2J");
                self.show_prompt();
                self.editor.redraw()
            }
            Key::Enter => {
                self.terminal.write(b"\r\n");
                let line = self.editor.take_line();
                self.line_received(&line).await;
                return;
            }
            Key::Interrupt => {
                self.interrupt().await;
                return;
            }
            Key::Eof => {
                self.end_of_input().await;
                return;
            }
            Key::Tab => {
                self.tab_complete().await;
                return;
            }
        };
        self.terminal.write(echo.as_bytes());
    }

    /// Ctrl-C: cancel the running command, drop queued statements and
    /// return to the prompt.
    async fn interrupt(&mut self) {
        self.terminal.write(b"^C\r\n");
        self.editor.clear();

        let Session { runtime, root, nested, .. } = self;
        let ctx = top(root, nested);
        if let Some(pipeline) = ctx.active.take() {
            runtime.abort(pipeline).await;
        }
        ctx.reset();
        self.state = SessionState::Idle;
        self.show_prompt();
    }

    /// Ctrl-D: end-of-input for a waiting command, `exit` on an empty line.
    /// Ignored during a timed wait.
    async fn end_of_input(&mut self) {
        if self.deadline().is_some() {
            return;
        }
        let Session { runtime, root, nested, editor, .. } = self;
        let ctx = top(root, nested);
        if ctx.active.is_some() {
            let outcome = runtime.resume(ctx, PipelineEvent::Eof).await;
            self.settle(outcome).await;
        } else if editor.is_empty() && !ctx.is_continuing() {
            self.terminal.write(b"exit\r\n");
            self.line_received("exit").await;
        }
    }

    async fn tab_complete(&mut self) {
        let ctx = self.current();
        let home = self.runtime.config.home_dir();
        let before = self.editor.before_cursor();
        match complete(self.runtime.fs.as_ref(), &ctx.cwd, &home, &before).await {
            Completion::None => {}
            Completion::Insert(text) => {
                let echo = self.editor.insert_str(&text);
                self.terminal.write(echo.as_bytes());
            }
            Completion::List(names) => {
                let width = self.terminal.window_size().cols;
                let listing = format_columns(&names, width);
                self.terminal.write(b"\r\n");
                self.terminal.write(listing.as_bytes());
                self.show_prompt();
                self.terminal.write(self.editor.redraw().as_bytes());
            }
        }
    }

    /// React to how the active context's queue run ended.
    async fn settle(&mut self, mut outcome: Outcome) {
        loop {
            match outcome {
                Outcome::Idle => {
                    let ctx = self.current();
                    if ctx.interactive {
                        // A line typed ahead may have left a statement open
                        self.state = if ctx.is_continuing() {
                            SessionState::AwaitingStatement
                        } else {
                            SessionState::Idle
                        };
                        self.show_prompt();
                    } else {
                        self.close();
                    }
                    return;
                }
                Outcome::Suspended => {
                    self.state = SessionState::Dispatching;
                    return;
                }
                Outcome::Shell => {
                    let parent = self.current();
                    match self.runtime.config.limits.check_nesting(parent.depth) {
                        Ok(()) => {
                            let child = parent.child(true, Arc::clone(&self.terminal));
                            tracing::debug!(depth = child.depth, "nested shell started");
                            self.nested.push(child);
                            self.state = SessionState::Idle;
                            self.show_prompt();
                            return;
                        }
                        Err(e) => {
                            parent.console.error_write(format!("-bash: {}\n", e).as_bytes());
                            let Session { runtime, root, nested, .. } = self;
                            outcome = runtime
                                .resume(top(root, nested), PipelineEvent::ShellExited)
                                .await;
                        }
                    }
                }
                Outcome::Exit => {
                    if self.nested.pop().is_none() {
                        self.close();
                        return;
                    }
                    tracing::debug!(depth = self.nested.len(), "nested shell exited");
                    let Session { runtime, root, nested, .. } = self;
                    outcome = runtime
                        .resume(top(root, nested), PipelineEvent::ShellExited)
                        .await;
                }
            }
        }
    }

    fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        tracing::info!(session = %self.runtime.config.session_id, "session closed");
        self.runtime.events.emit(Event::SessionClosed {
            session: self.runtime.config.session_id.clone(),
        });
        self.terminal.close();
    }
}

fn truncate(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while end > 0 && !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Builder for customized Session configuration.
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<Config>,
    fs: Option<Arc<dyn FileSystem>>,
    commands: Option<CommandTable>,
    extra: Vec<(Vec<String>, CommandFactory)>,
    texts: Vec<(String, String)>,
    events: Option<Arc<dyn EventSink>>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    interactive: Option<bool>,
}

impl SessionBuilder {
    /// Set the session configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom filesystem.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Replace the whole command table.
    pub fn commands(mut self, commands: CommandTable) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Register an additional command under one or more names or paths.
    pub fn command<F>(mut self, names: &[&str], factory: F) -> Self
    where
        F: Fn() -> Box<dyn Command> + Send + Sync + 'static,
    {
        let names = names.iter().map(|n| n.to_string()).collect();
        let factory: CommandFactory = Arc::new(factory);
        self.extra.push((names, factory));
        self
    }

    /// Register a static text command.
    pub fn text_command(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.push((path.into(), text.into()));
        self
    }

    /// Set where session events go. Defaults to [`TracingEventSink`].
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the initial working directory. Defaults to the home directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Whether the root context talks to a live client (default: true).
    ///
    /// A non-interactive session runs what it is given and closes.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    /// Build the session writing to `terminal`.
    pub fn build(self, terminal: Arc<dyn Terminal>) -> Session {
        let config = self.config.unwrap_or_default();
        let fs = self.fs.unwrap_or_else(|| Arc::new(InMemoryFs::new()));
        let mut commands = self.commands.unwrap_or_else(CommandTable::with_defaults);
        for (names, factory) in self.extra {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            commands.register(&names, move || factory());
        }
        for (path, text) in self.texts {
            commands.register_text(path, text);
        }
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(TracingEventSink));

        let mut env = config.initial_env();
        env.extend(self.env);
        let cwd = self
            .cwd
            .unwrap_or_else(|| PathBuf::from(config.home_dir()));
        env.insert("PWD".to_string(), cwd.to_string_lossy().into_owned());

        let root = InterpreterContext::new(
            env,
            cwd,
            self.interactive.unwrap_or(true),
            Arc::clone(&terminal),
        );
        let editor = LineEditor::new(config.limits.max_history);
        tracing::info!(
            session = %config.session_id,
            user = %config.username,
            host = %config.hostname,
            "session opened"
        );

        Session {
            runtime: Runtime::new(fs, Arc::new(commands), events, Arc::new(config)),
            terminal,
            root,
            nested: Vec::new(),
            state: SessionState::Idle,
            editor,
        }
    }
}
