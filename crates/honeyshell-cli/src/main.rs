//! Honeyshell CLI - drive one emulated session from the local terminal
//!
//! Usage:
//!   honeyshell -c 'uname -a; whoami'    # Run a command string and exit
//!   honeyshell --config box.json         # Line-mode session on stdin
//!   honeyshell --hostname web01 --user admin
//!
//! Session events are logged through `tracing` to stderr; set `RUST_LOG`
//! to choose the level.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use honeyshell::{Config, Session, Terminal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Honeyshell - emulated shell for interactive honeypots
#[derive(Parser, Debug)]
#[command(name = "honeyshell")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the given command string in a non-interactive session
    #[arg(short = 'c')]
    command: Option<String>,

    /// JSON session configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the emulated hostname
    #[arg(long)]
    hostname: Option<String>,

    /// Override the login account
    #[arg(long)]
    user: Option<String>,

    /// Directory receiving copies of files written through redirections
    #[arg(long)]
    download_path: Option<PathBuf>,
}

/// Terminal writing to the process's stdout and stderr.
struct StdioTerminal;

impl Terminal for StdioTerminal {
    fn write(&self, data: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(data);
        let _ = out.flush();
    }

    fn error_write(&self, data: &[u8]) {
        let _ = std::io::stderr().lock().write_all(data);
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Config::from_json(&text)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(hostname) = &args.hostname {
        config.hostname = hostname.clone();
    }
    if let Some(user) = &args.user {
        config.username = user.clone();
    }
    if let Some(path) = &args.download_path {
        config.download_path = Some(path.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::debug!(hostname = %config.hostname, user = %config.username, "config loaded");
    let terminal = Arc::new(StdioTerminal);

    if let Some(command) = args.command {
        let mut session = Session::builder()
            .config(config)
            .interactive(false)
            .build(terminal);
        session.line_received(&command).await;
        return Ok(());
    }

    let mut session = Session::builder().config(config).build(terminal);
    session.show_prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while session.state() != honeyshell::SessionState::Closed {
        let deadline = session.deadline();
        tokio::select! {
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => session.line_received(&line).await,
                None => {
                    session.key_received(honeyshell::Key::Eof).await;
                    break;
                }
            },
            _ = wait_until(deadline) => session.timer_expired().await,
        }
    }
    Ok(())
}

/// Resolves at `deadline`, or never when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
