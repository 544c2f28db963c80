//! Honeyshell - emulated shell for interactive honeypots
//!
//! Gives an untrusted client something that looks and behaves like a bash
//! login shell on a small Linux server, backed by an in-memory filesystem
//! and a table of emulated commands. Every statement, failed command and
//! file written through a redirection is reported as an [`Event`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use honeyshell::{BufferTerminal, Session};
//!
//! # tokio_test::block_on(async {
//! let terminal = Arc::new(BufferTerminal::new());
//! let mut session = Session::builder().build(terminal.clone());
//! session.show_prompt();
//! session.line_received("echo hello | grep hell").await;
//! assert_eq!(terminal.output(), "root@svr04:~# hello\nroot@svr04:~# ");
//! # });
//! ```
//!
//! # Custom Commands
//!
//! ```rust
//! use honeyshell::{Command, CommandContext, ExecResult, Session, async_trait};
//!
//! struct Nproc;
//!
//! #[async_trait]
//! impl Command for Nproc {
//!     async fn start(&mut self, _ctx: CommandContext<'_>) -> honeyshell::Result<ExecResult> {
//!         Ok(ExecResult::ok("4\n"))
//!     }
//! }
//!
//! let builder = Session::builder().command(&["nproc", "/usr/bin/nproc"], || Box::new(Nproc));
//! # let _ = builder;
//! ```

mod commands;
mod config;
mod error;
mod events;
mod fs;
mod interpreter;
mod limits;
mod logging;
pub mod parser;
mod session;
mod terminal;

pub use async_trait::async_trait;
pub use commands::{Command, CommandFactory, CommandTable, Context as CommandContext};
pub use config::{Config, DEFAULT_HOSTNAME, DEFAULT_PATH, DEFAULT_USERNAME};
pub use error::{Error, Result};
pub use events::{Event, EventSink, MemoryEventSink, TracingEventSink};
pub use fs::{DirEntry, FileSystem, FileType, InMemoryFs, Metadata};
pub use interpreter::{ExecResult, Flow, SessionState};
pub use limits::{LimitExceeded, Limits};
pub use logging::{LogConfig, sanitize_for_log};
pub use session::{Key, Session, SessionBuilder, decode as decode_keys};
pub use terminal::{BufferTerminal, CaptureTerminal, Terminal, WindowSize};
