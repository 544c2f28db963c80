//! Interpreter for emulated shell sessions
//!
//! The [`Runtime`] holds what every interpreter context of a session
//! shares: the virtual filesystem, the command table, the event sink and
//! the configuration. It turns queued statements into pipelines and steps
//! them; the session decides what to do when a pipeline has to wait.

mod context;
mod expand;
mod pipeline;
mod sink;
mod state;

pub(crate) use context::InterpreterContext;
pub(crate) use pipeline::{Pipeline, PipelineEvent};
pub(crate) use state::Outcome;
pub use state::{ExecResult, Flow, SessionState};

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pipeline::{ParsedCommand, PreparedStage, StageTarget, Status};
use sink::{StageInput, StageSink};

use crate::commands::CommandTable;
use crate::config::Config;
use crate::error::Error;
use crate::events::{Event, EventSink};
use crate::fs::{FileSystem, expand_glob};
use crate::limits::LimitExceeded;
use crate::logging::sanitize_for_log;
use crate::parser::{Arg, StageSource, Statement, Token, Word, parse_redirections};
use crate::terminal::{CaptureTerminal, Terminal};

/// Collaborators shared by all interpreter contexts of one session.
pub(crate) struct Runtime {
    pub fs: Arc<dyn FileSystem>,
    pub commands: Arc<CommandTable>,
    pub events: Arc<dyn EventSink>,
    pub config: Arc<Config>,
}

impl Runtime {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        commands: Arc<CommandTable>,
        events: Arc<dyn EventSink>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            fs,
            commands,
            events,
            config,
        }
    }

    /// Dispatch queued statements until the queue is empty or a pipeline
    /// has to wait.
    pub(crate) async fn drive(&self, ctx: &mut InterpreterContext) -> Outcome {
        while let Some(statement) = ctx.pending.pop_front() {
            let Some(pipeline) = self.dispatch(ctx, statement).await else {
                continue;
            };
            if let Some(outcome) = self.step(ctx, pipeline, PipelineEvent::Start).await {
                return outcome;
            }
        }
        Outcome::Idle
    }

    /// Resume the suspended pipeline of `ctx` with `event`, then keep
    /// draining the queue.
    pub(crate) async fn resume(&self, ctx: &mut InterpreterContext, event: PipelineEvent) -> Outcome {
        if let Some(pipeline) = ctx.active.take() {
            if let Some(outcome) = self.step(ctx, pipeline, event).await {
                return outcome;
            }
        }
        self.drive(ctx).await
    }

    async fn step(
        &self,
        ctx: &mut InterpreterContext,
        mut pipeline: Pipeline,
        event: PipelineEvent,
    ) -> Option<Outcome> {
        match self.advance(ctx, &mut pipeline, event).await {
            Status::Finished => None,
            Status::Suspended => {
                ctx.active = Some(pipeline);
                Some(Outcome::Suspended)
            }
            Status::Shell => {
                ctx.active = Some(pipeline);
                Some(Outcome::Shell)
            }
            Status::Exit => {
                ctx.pending.clear();
                Some(Outcome::Exit)
            }
        }
    }

    /// Run `script` in a nested non-interactive context and capture what it
    /// writes.
    ///
    /// The child reads `input` when given, otherwise whatever `ctx` reads.
    /// `env` is layered over the copied environment.
    pub(crate) async fn run_captured(
        &self,
        ctx: &InterpreterContext,
        script: &str,
        input: Option<&str>,
        env: &[(String, String)],
    ) -> Result<(String, String), LimitExceeded> {
        self.config.limits.check_nesting(ctx.depth)?;

        let capture = Arc::new(CaptureTerminal::new());
        let mut child = ctx.child(false, capture.clone());
        if let Some(input) = input {
            child.stdin = Some(input.to_string());
        }
        child.env.extend(env.iter().cloned());
        match child.queue_line(script) {
            Ok(_) => {
                self.run_nested(&mut child).await;
            }
            Err(e) => capture.error_write(Error::Syntax(e).shell_message().as_bytes()),
        }
        Ok((capture.take_stdout(), capture.take_stderr()))
    }

    fn run_nested<'a>(
        &'a self,
        ctx: &'a mut InterpreterContext,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + 'a>> {
        Box::pin(self.drive(ctx))
    }

    /// Compile a statement into a pipeline: expand every stage, resolve
    /// every command, then wire sinks from the last stage backwards.
    ///
    /// Returns `None` when nothing has to run or a command did not resolve.
    async fn dispatch(&self, ctx: &mut InterpreterContext, statement: Statement) -> Option<Pipeline> {
        let Statement { text, stages } = statement;
        let input = sanitize_for_log(&text);
        if self.config.log.log_input {
            tracing::info!(
                session = %self.config.session_id,
                input = %self.config.log.sanitize(&text),
                "command input"
            );
        }
        self.events.emit(Event::CommandInput {
            session: self.config.session_id.clone(),
            input: input.clone(),
        });

        let mut compiled = Vec::with_capacity(stages.len());
        for (index, source) in stages.into_iter().enumerate() {
            compiled.push(self.compile_stage(ctx, source, index == 0).await);
        }

        let path_list = ctx.env.get("PATH").cloned().unwrap_or_default();
        let mut resolved = Vec::with_capacity(compiled.len());
        let mut missing = Vec::new();
        for (mut command, group) in compiled {
            let target = match group {
                Some(script) => StageTarget::Group(script),
                None if command.name.is_empty() => {
                    ctx.env.extend(command.env_overrides.drain(..));
                    StageTarget::Noop
                }
                None => match self
                    .commands
                    .get_command(&command.name, &ctx.cwd, &path_list, self.fs.as_ref())
                    .await
                {
                    Some(found) => StageTarget::Command(found),
                    None => {
                        missing.push(command.name.clone());
                        StageTarget::Noop
                    }
                },
            };
            tracing::debug!(
                command = %sanitize_for_log(&command.name),
                args = command.args.len(),
                redirections = command.redirections.len(),
                "stage compiled"
            );
            resolved.push((command, target));
        }

        if !missing.is_empty() {
            for name in missing {
                ctx.console
                    .error_write(Error::CommandNotFound(name).shell_message().as_bytes());
            }
            self.events.emit(Event::CommandFailed {
                session: self.config.session_id.clone(),
                input,
            });
            return None;
        }

        if let [(command, StageTarget::Noop)] = resolved.as_slice() {
            if command.redirections.is_empty() {
                return None;
            }
        }

        let count = resolved.len();
        let mut prepared = VecDeque::with_capacity(count);
        for (index, (command, target)) in resolved.into_iter().enumerate().rev() {
            let mut sink = StageSink::new(Arc::clone(&ctx.console), index + 1 < count);
            let mut stage_input = StageInput::Pipe;
            for op in &command.redirections {
                sink.apply(op, &self.fs, &ctx.cwd, &self.config, &mut stage_input)
                    .await;
            }
            prepared.push_front(PreparedStage {
                command,
                target,
                sink,
                input: stage_input,
            });
        }

        Some(Pipeline::new(text, prepared))
    }

    /// Expand one stage. Only the first stage of a statement is globbed.
    async fn compile_stage(
        &self,
        ctx: &mut InterpreterContext,
        source: StageSource,
        glob: bool,
    ) -> (ParsedCommand, Option<String>) {
        match source {
            StageSource::Simple(tokens) => {
                let mut tokens = tokens.into_iter().peekable();
                let mut env_overrides = Vec::new();
                while let Some((name, value)) = tokens
                    .peek()
                    .and_then(Token::as_word)
                    .and_then(Word::split_assignment)
                {
                    tokens.next();
                    env_overrides.push((name, self.expand_joined(ctx, &value).await));
                }

                let args = self.expand_tokens(ctx, tokens).await;
                let (args, redirections) = parse_redirections(args);

                let mut words = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        Arg::Word {
                            text, glob: true, ..
                        } if glob => {
                            let matches = expand_glob(self.fs.as_ref(), &ctx.cwd, &text)
                                .await
                                .unwrap_or_default();
                            if matches.is_empty() {
                                words.push(text);
                            } else {
                                words.extend(matches);
                            }
                        }
                        other => words.push(other.into_text()),
                    }
                }

                let mut words = words.into_iter();
                let command = ParsedCommand {
                    name: words.next().unwrap_or_default(),
                    args: words.collect(),
                    env_overrides,
                    redirections,
                };
                (command, None)
            }
            StageSource::Group { script, redirects } => {
                let args = self.expand_tokens(ctx, redirects).await;
                let (_, redirections) = parse_redirections(args);
                let command = ParsedCommand {
                    redirections,
                    ..ParsedCommand::default()
                };
                (command, Some(script))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use super::*;
    use crate::events::MemoryEventSink;
    use crate::fs::InMemoryFs;
    use std::path::PathBuf;

    /// A runtime plus a root context writing into a capture buffer.
    pub(crate) struct Harness {
        pub runtime: Runtime,
        pub ctx: InterpreterContext,
        pub console: Arc<CaptureTerminal>,
        pub events: Arc<MemoryEventSink>,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            Self::with_fs(InMemoryFs::new())
        }

        pub(crate) fn with_fs(fs: InMemoryFs) -> Self {
            let config = Config::default();
            let events = Arc::new(MemoryEventSink::new());
            let console = Arc::new(CaptureTerminal::new());
            let ctx = InterpreterContext::new(
                config.initial_env(),
                PathBuf::from("/root"),
                false,
                console.clone(),
            );
            let runtime = Runtime::new(
                Arc::new(fs),
                Arc::new(CommandTable::with_defaults()),
                events.clone(),
                Arc::new(config),
            );
            Self {
                runtime,
                ctx,
                console,
                events,
            }
        }

        /// Run a line to completion, returning (stdout, stderr).
        pub(crate) async fn run(&mut self, line: &str) -> (String, String) {
            match self.ctx.queue_line(line) {
                Ok(_) => {
                    self.runtime.drive(&mut self.ctx).await;
                }
                Err(e) => self
                    .console
                    .error_write(Error::Syntax(e).shell_message().as_bytes()),
            }
            (self.console.take_stdout(), self.console.take_stderr())
        }

        pub(crate) async fn stdout(&mut self, line: &str) -> String {
            self.run(line).await.0
        }

        pub(crate) async fn read(&self, path: &str) -> String {
            let content = self
                .runtime
                .fs
                .read_file(std::path::Path::new(path))
                .await
                .unwrap();
            String::from_utf8(content).unwrap()
        }
    }
}
