//! Output routing for pipeline stages
//!
//! Every stage gets a [`StageSink`] mapping its file descriptors to where
//! the bytes go: the context console, the next stage's input buffer, a
//! virtual file, or nowhere. Redirections rewrite that map left to right.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{Error, Result, io_reason};
use crate::events::{Event, EventSink};
use crate::fs::{FileSystem, resolve_path};
use crate::limits::Limits;
use crate::logging::sanitize_for_log;
use crate::parser::RedirectionOp;
use crate::terminal::Terminal;

const DEV_NULL: &str = "/dev/null";

/// Where one file descriptor writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Console,
    Stderr,
    Pipe,
    File(usize),
    Null,
}

/// Where a stage reads its input from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StageInput {
    /// Output of the previous stage, or the client for the first stage.
    Pipe,
    /// Contents of a `<` redirection.
    File(String),
    /// A `<` redirection failed; the stage does not run.
    Missing,
}

pub(crate) struct StageSink {
    routes: BTreeMap<u32, Route>,
    console: Arc<dyn Terminal>,
    pipe: String,
    files: Vec<FileSink>,
}

impl StageSink {
    /// Sink for one stage; `piped` stages send fd 1 to the next stage.
    pub fn new(console: Arc<dyn Terminal>, piped: bool) -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(0, Route::Console);
        routes.insert(1, if piped { Route::Pipe } else { Route::Console });
        routes.insert(2, Route::Stderr);
        Self {
            routes,
            console,
            pipe: String::new(),
            files: Vec::new(),
        }
    }

    pub fn route(&self, fd: u32) -> Option<Route> {
        self.routes.get(&fd).copied()
    }

    fn report(&self, message: &str) {
        self.console.error_write(message.as_bytes());
    }

    /// Apply one redirection. Failures are reported on the console and
    /// downgrade the fd instead of aborting the stage.
    pub async fn apply(
        &mut self,
        op: &RedirectionOp,
        fs: &Arc<dyn FileSystem>,
        cwd: &Path,
        config: &Config,
        input: &mut StageInput,
    ) {
        match op {
            RedirectionOp::FileWrite { fd, path } | RedirectionOp::FileAppend { fd, path } => {
                let append = matches!(op, RedirectionOp::FileAppend { .. });
                let target = resolve_path(cwd, path);
                if target == Path::new(DEV_NULL) {
                    self.routes.insert(*fd, Route::Null);
                    return;
                }
                match FileSink::open(Arc::clone(fs), path, target, append, config).await {
                    Ok(file) => {
                        self.files.push(file);
                        self.routes.insert(*fd, Route::File(self.files.len() - 1));
                    }
                    Err(e) => {
                        self.report(&Error::redirection(path.as_str(), io_reason(&e)).shell_message());
                        self.routes.insert(*fd, Route::Null);
                    }
                }
            }
            RedirectionOp::Stdin { fd, path } => {
                if *fd != 0 {
                    return;
                }
                let target = resolve_path(cwd, path);
                if target == Path::new(DEV_NULL) {
                    *input = StageInput::File(String::new());
                    return;
                }
                match fs.read_file(&target).await {
                    Ok(content) => {
                        *input = StageInput::File(String::from_utf8_lossy(&content).into_owned());
                    }
                    Err(e) => {
                        self.report(&Error::redirection(path.as_str(), io_reason(&e)).shell_message());
                        *input = StageInput::Missing;
                    }
                }
            }
            RedirectionOp::FdDup { fd, target } => match self.route(*target) {
                Some(route) => {
                    self.routes.insert(*fd, route);
                }
                None => self.report(&format!("-bash: {}: Bad file descriptor\n", target)),
            },
            // Closing a descriptor has no effect
            RedirectionOp::FdClose { .. } => {}
        }
    }

    /// Write output on `fd`. Fails only when a file quota is exceeded.
    pub async fn deliver_output(&mut self, fd: u32, data: &str) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match self.route(fd) {
            Some(Route::Console) => self.console.write(data.as_bytes()),
            Some(Route::Stderr) => self.console.error_write(data.as_bytes()),
            Some(Route::Pipe) => self.pipe.push_str(data),
            Some(Route::File(index)) => {
                if let Some(file) = self.files.get_mut(index) {
                    file.write(data.as_bytes()).await?;
                }
            }
            Some(Route::Null) | None => {}
        }
        Ok(())
    }

    /// Finish the stage: finalize file sinks, emit one redirect event per
    /// file, and return everything written to the pipe.
    pub async fn close(self, events: &dyn EventSink, session: &str, input: &str) -> String {
        for file in self.files {
            events.emit(file.finish(session, input).await);
        }
        self.pipe
    }
}

struct Staging {
    path: PathBuf,
    file: tokio::fs::File,
}

/// A virtual file receiving redirected output, mirrored to an on-disk
/// staging copy when a download directory is configured.
pub(crate) struct FileSink {
    fs: Arc<dyn FileSystem>,
    shown: String,
    target: PathBuf,
    staging: Option<Staging>,
    hasher: Sha256,
    written: u64,
    limits: Limits,
    full: bool,
}

impl FileSink {
    /// Open the target: `>` truncates, `>>` creates when missing.
    async fn open(
        fs: Arc<dyn FileSystem>,
        shown: &str,
        target: PathBuf,
        append: bool,
        config: &Config,
    ) -> Result<Self> {
        if append {
            fs.append_file(&target, b"").await?;
        } else {
            fs.write_file(&target, b"").await?;
        }
        tracing::debug!(path = %sanitize_for_log(shown), append, "redirect target opened");

        let staging = match &config.download_path {
            Some(dir) => open_staging(dir, &config.session_id, &target).await,
            None => None,
        };

        Ok(Self {
            fs,
            shown: shown.to_string(),
            target,
            staging,
            hasher: Sha256::new(),
            written: 0,
            limits: config.limits.clone(),
            full: false,
        })
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.full {
            return Ok(());
        }
        if let Err(source) = self.limits.check_file_size(self.written, data.len() as u64) {
            self.full = true;
            tracing::warn!(path = %sanitize_for_log(&self.shown), "redirect quota exceeded");
            return Err(Error::Quota {
                path: self.shown.clone(),
                source,
            });
        }

        self.fs.append_file(&self.target, data).await?;
        self.hasher.update(data);
        self.written += data.len() as u64;

        if let Some(staging) = &mut self.staging {
            if let Err(e) = staging.file.write_all(data).await {
                tracing::warn!(error = %e, "staging write failed");
                self.staging = None;
            }
        }
        Ok(())
    }

    async fn finish(self, session: &str, input: &str) -> Event {
        let source_path = match self.staging {
            Some(mut staging) => {
                if let Err(e) = staging.file.flush().await {
                    tracing::warn!(error = %e, "staging flush failed");
                }
                staging.path.to_string_lossy().into_owned()
            }
            None => String::new(),
        };
        let shasum: String = self
            .hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        Event::FileRedirect {
            session: session.to_string(),
            input: sanitize_for_log(input),
            output_path: self.target.to_string_lossy().into_owned(),
            source_path,
            shasum,
            size: self.written,
        }
    }
}

/// `/tmp/a b` becomes `_tmp_a_b`.
fn staging_name(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn open_staging(dir: &Path, session: &str, target: &Path) -> Option<Staging> {
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S%6f");
    let path = dir.join(format!("{}-{}-{}", session, timestamp, staging_name(target)));
    match tokio::fs::File::create(&path).await {
        Ok(file) => Some(Staging { path, file }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot create staging file");
            None
        }
    }
}
