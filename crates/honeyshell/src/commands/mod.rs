//! Command emulations
//!
//! This module provides the [`Command`] trait every emulated program
//! implements, the [`Context`] it runs with, and the [`CommandTable`] the
//! dispatcher resolves names through.
//!
//! # Custom Commands
//!
//! ```rust
//! use honeyshell::{Command, CommandContext, ExecResult, async_trait};
//!
//! struct Nproc;
//!
//! #[async_trait]
//! impl Command for Nproc {
//!     async fn start(&mut self, _ctx: CommandContext<'_>) -> honeyshell::Result<ExecResult> {
//!         Ok(ExecResult::ok("4\n"))
//!     }
//! }
//! ```
//!
//! Register via [`SessionBuilder::command`](crate::SessionBuilder::command).
//!
//! Commands are instantiated per invocation. A command that wants more
//! input returns [`Flow::AwaitInput`](crate::Flow::AwaitInput) and then
//! receives [`Command::line_received`] calls until it finishes.

mod cat;
mod echo;
mod environ;
mod flow;
mod grep;
mod navigation;
mod shell;
mod sleep;
mod system;
mod text;

pub use cat::Cat;
pub use echo::Echo;
pub use environ::{Env, Export};
pub use flow::{Exit, False, True};
pub use grep::Grep;
pub use navigation::{Cd, Pwd};
pub use shell::Sh;
pub use sleep::Sleep;
pub use system::{Hostname, Uname, Whoami};
pub use text::{ScriptCommand, TextCommand};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::fs::{FileSystem, resolve_path};
use crate::interpreter::ExecResult;

/// Execution context for commands.
///
/// Built fresh for every hook call from the owning interpreter context.
pub struct Context<'a> {
    /// Name the command was invoked as (`argv[0]`).
    pub name: &'a str,

    /// Command arguments (not including the command name).
    pub args: &'a [String],

    /// Environment of the interpreter context, including any
    /// `NAME=value` prefixes given for this command.
    pub env: &'a mut HashMap<String, String>,

    /// Current working directory (mutable, for `cd`).
    pub cwd: &'a mut PathBuf,

    /// Virtual filesystem.
    pub fs: Arc<dyn FileSystem>,

    /// Piped or redirected input.
    ///
    /// `None` means the command reads from the client.
    pub stdin: Option<&'a str>,

    /// Whether the interpreter context talks to a live client.
    pub interactive: bool,

    /// Session configuration (hostname, account, limits).
    pub config: &'a Config,
}

impl Context<'_> {
    /// Resolve a path argument against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_path(self.cwd, path)
    }
}

/// Trait for emulated commands.
///
/// Hooks return an [`ExecResult`] whose output is delivered through the
/// stage's sinks and whose [`Flow`](crate::Flow) tells the interpreter what
/// to do next. Errors are printed as `-bash: <name>: <message>` and finish
/// the command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Run the command.
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult>;

    /// A line of client input arrived while the command awaited input.
    async fn line_received(&mut self, _ctx: Context<'_>, _line: &str) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    /// The client sent end-of-input (Ctrl-D), or the context is not
    /// interactive and there is no more input.
    async fn eof_received(&mut self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    /// The client pressed Ctrl-C or the command was cut short.
    fn cancel(&mut self) {}
}

/// Creates a fresh command instance per invocation.
pub type CommandFactory = Arc<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Immutable registry of command names and virtual paths.
#[derive(Clone, Default)]
pub struct CommandTable {
    commands: HashMap<String, CommandFactory>,
    texts: HashMap<String, String>,
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the reference command set.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(&["echo", "/bin/echo"], || Box::new(Echo));
        table.register(&["cat", "/bin/cat"], || Box::new(Cat::default()));
        table.register(&["grep", "/bin/grep"], || Box::new(Grep::default()));
        table.register(&["cd"], || Box::new(Cd));
        table.register(&["pwd", "/bin/pwd"], || Box::new(Pwd));
        table.register(&["exit", "logout"], || Box::new(Exit));
        table.register(&["true", "/bin/true"], || Box::new(True));
        table.register(&["false", "/bin/false"], || Box::new(False));
        table.register(&["sh", "bash", "/bin/sh", "/bin/bash"], || Box::new(Sh));
        table.register(&["sleep", "/bin/sleep"], || Box::new(Sleep));
        table.register(&["export"], || Box::new(Export));
        table.register(&["env", "/usr/bin/env"], || Box::new(Env));
        table.register(&["whoami", "/usr/bin/whoami"], || Box::new(Whoami));
        table.register(&["uname", "/bin/uname"], || Box::new(Uname));
        table.register(&["hostname", "/bin/hostname"], || Box::new(Hostname));
        table.register_text("/usr/bin/nproc", "1\n");
        table
    }

    /// Register a command under one or more names or absolute paths.
    pub fn register<F>(&mut self, names: &[&str], factory: F)
    where
        F: Fn() -> Box<dyn Command> + Send + Sync + 'static,
    {
        let factory: CommandFactory = Arc::new(factory);
        for name in names {
            self.commands.insert((*name).to_string(), Arc::clone(&factory));
        }
    }

    /// Register a static text command: running `path` prints `text`.
    pub fn register_text(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.texts.insert(path.into(), text.into());
    }

    /// Whether a bare name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered bare command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .commands
            .keys()
            .map(String::as_str)
            .filter(|n| !n.starts_with('/'))
            .collect();
        names.sort_unstable();
        names
    }

    fn lookup_path(&self, path: &Path) -> Option<Box<dyn Command>> {
        let key = path.to_string_lossy();
        if let Some(factory) = self.commands.get(key.as_ref()) {
            return Some(factory());
        }
        self.texts
            .get(key.as_ref())
            .map(|text| Box::new(TextCommand::new(text.clone())) as Box<dyn Command>)
    }

    /// Resolve a command name.
    ///
    /// Order: registered name, then explicit path (registered path, text
    /// command, or a plain-text virtual file run as a script), then a
    /// search of `path_list` for registered paths and text commands.
    pub async fn get_command(
        &self,
        name: &str,
        cwd: &Path,
        path_list: &str,
        fs: &dyn FileSystem,
    ) -> Option<Box<dyn Command>> {
        if name.is_empty() {
            return None;
        }

        if name.contains('/') {
            let path = resolve_path(cwd, name);
            if let Some(command) = self.lookup_path(&path) {
                return Some(command);
            }
            let meta = fs.stat(&path).await.ok()?;
            if !meta.file_type.is_file() {
                return None;
            }
            let content = fs.read_file(&path).await.ok()?;
            // Binary files are not run
            if content.contains(&0) {
                return None;
            }
            let script = String::from_utf8(content).ok()?;
            return Some(Box::new(ScriptCommand::new(script)));
        }

        if let Some(factory) = self.commands.get(name) {
            return Some(factory());
        }

        path_list
            .split(':')
            .filter(|dir| !dir.is_empty())
            .find_map(|dir| self.lookup_path(&Path::new(dir).join(name)))
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("commands", &self.names())
            .field("texts", &self.texts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use super::*;
    use crate::fs::InMemoryFs;

    /// Owned state for building a [`Context`] in unit tests.
    pub(crate) struct TestEnv {
        pub args: Vec<String>,
        pub env: HashMap<String, String>,
        pub cwd: PathBuf,
        pub fs: Arc<dyn FileSystem>,
        pub config: Config,
    }

    impl TestEnv {
        pub(crate) fn new(args: &[&str]) -> Self {
            let config = Config::default();
            Self {
                args: args.iter().map(|s| s.to_string()).collect(),
                env: config.initial_env(),
                cwd: PathBuf::from("/root"),
                fs: Arc::new(InMemoryFs::new()),
                config,
            }
        }

        pub(crate) fn with_fs(mut self, fs: InMemoryFs) -> Self {
            self.fs = Arc::new(fs);
            self
        }

        pub(crate) fn ctx<'a>(&'a mut self, name: &'a str, stdin: Option<&'a str>) -> Context<'a> {
            Context {
                name,
                args: &self.args,
                env: &mut self.env,
                cwd: &mut self.cwd,
                fs: Arc::clone(&self.fs),
                stdin,
                interactive: true,
                config: &self.config,
            }
        }
    }
}
