//! Pipeline execution
//!
//! A [`Pipeline`] is built once per statement and then stepped by
//! [`Runtime::advance`]. Stages run strictly one after another: a stage
//! starts only after its predecessor finished, with the predecessor's
//! complete output as its input. A stage waiting for client input, for its
//! timer or for a nested shell suspends the whole pipeline until the
//! session resumes it.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

use super::context::InterpreterContext;
use super::sink::{StageInput, StageSink};
use super::state::{ExecResult, Flow};
use super::Runtime;
use crate::commands::{Command, Context};
use crate::error::Result;
use crate::parser::RedirectionOp;

/// One compiled pipeline stage before it runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
    /// `NAME=value` prefixes, visible to this command only.
    pub env_overrides: Vec<(String, String)>,
    pub redirections: Vec<RedirectionOp>,
}

pub(crate) enum StageTarget {
    Command(Box<dyn Command>),
    /// A `( ... )` group run in a nested context.
    Group(String),
    /// No command word: only redirections and assignments.
    Noop,
}

pub(crate) struct PreparedStage {
    pub command: ParsedCommand,
    pub target: StageTarget,
    pub sink: StageSink,
    pub input: StageInput,
}

pub(crate) struct Pipeline {
    /// Source text of the statement, for events.
    pub text: String,
    stages: VecDeque<PreparedStage>,
    len: usize,
    /// Output of the last finished stage.
    input: Option<String>,
    /// When the current stage's timed wait ends.
    deadline: Option<Instant>,
}

impl Pipeline {
    pub fn new(text: String, stages: VecDeque<PreparedStage>) -> Self {
        let len = stages.len();
        Self {
            text,
            stages,
            len,
            input: None,
            deadline: None,
        }
    }

    /// When the running stage's timed wait ends, if it is in one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Forward Ctrl-C to the running stage.
    pub fn cancel(&mut self) {
        if let Some(PreparedStage {
            target: StageTarget::Command(command),
            ..
        }) = self.stages.front_mut()
        {
            command.cancel();
        }
    }
}

/// What resumes a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PipelineEvent {
    Start,
    Line(String),
    Eof,
    /// The nested shell the current stage started has exited.
    ShellExited,
    /// The current stage's timed wait is over.
    Timer,
}

/// Where [`Runtime::advance`] left a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Finished,
    Suspended,
    Shell,
    Exit,
}

impl Runtime {
    /// Drive a pipeline until it finishes or has to wait.
    pub(crate) async fn advance(
        &self,
        ctx: &mut InterpreterContext,
        pipeline: &mut Pipeline,
        mut event: PipelineEvent,
    ) -> Status {
        loop {
            let single = pipeline.len == 1;
            let current = std::mem::replace(&mut event, PipelineEvent::Start);
            pipeline.deadline = None;
            // Only the first stage reads the context's own input
            let inherited = match pipeline.input {
                None => ctx.stdin.clone(),
                Some(_) => None,
            };
            let Some(stage) = pipeline.stages.front_mut() else {
                return Status::Finished;
            };
            let stdin = match &stage.input {
                StageInput::File(text) => Some(text.as_str()),
                _ => pipeline.input.as_deref().or(inherited.as_deref()),
            };

            let flow = match (&mut stage.target, &stage.input) {
                (_, StageInput::Missing) | (StageTarget::Noop, _) => Flow::Done,
                (StageTarget::Group(script), _) => {
                    self.run_into(ctx, script, stdin, &[], &mut stage.sink).await;
                    Flow::Done
                }
                (StageTarget::Command(command), _) => {
                    let result = self
                        .call_hook(ctx, command.as_mut(), &stage.command, stdin, current.clone())
                        .await
                        .unwrap_or_else(|e| {
                            ExecResult::err(format!("-bash: {}: {}\n", stage.command.name, e), 1)
                        });

                    let delivered = match stage.sink.deliver_output(1, &result.stdout).await {
                        Ok(()) => stage.sink.deliver_output(2, &result.stderr).await,
                        Err(e) => Err(e),
                    };
                    match delivered {
                        Ok(()) => result.flow,
                        Err(e) => {
                            ctx.console.error_write(e.shell_message().as_bytes());
                            command.cancel();
                            Flow::Done
                        }
                    }
                }
            };

            match flow {
                Flow::Done => {}
                Flow::AwaitInput if ctx.interactive => return Status::Suspended,
                Flow::AwaitInput => {
                    // Non-interactive input is already exhausted
                    if current != PipelineEvent::Eof {
                        event = PipelineEvent::Eof;
                        continue;
                    }
                }
                Flow::Script(script) => {
                    let env = &stage.command.env_overrides;
                    self.run_into(ctx, &script, stdin, env, &mut stage.sink).await;
                }
                Flow::InputScript(script) => {
                    let env = &stage.command.env_overrides;
                    self.run_into(ctx, &script, Some(""), env, &mut stage.sink).await;
                }
                Flow::Wait(duration) if ctx.interactive => {
                    pipeline.deadline = Some(Instant::now() + duration);
                    return Status::Suspended;
                }
                Flow::Wait(duration) => tokio::time::sleep(duration).await,
                Flow::Shell if ctx.interactive => return Status::Shell,
                Flow::Shell => {}
                Flow::Exit if single => {
                    self.finish_stage(pipeline).await;
                    return Status::Exit;
                }
                // exit inside a multi-stage pipeline only ends its own stage
                Flow::Exit => {}
            }

            let output = self.finish_stage(pipeline).await;
            if pipeline.stages.is_empty() {
                return Status::Finished;
            }
            pipeline.input = Some(output);
        }
    }

    /// Close every remaining stage of an abandoned pipeline.
    pub(crate) async fn abort(&self, mut pipeline: Pipeline) {
        pipeline.cancel();
        while !pipeline.stages.is_empty() {
            self.finish_stage(&mut pipeline).await;
        }
    }

    async fn finish_stage(&self, pipeline: &mut Pipeline) -> String {
        match pipeline.stages.pop_front() {
            Some(stage) => {
                stage
                    .sink
                    .close(self.events.as_ref(), &self.config.session_id, &pipeline.text)
                    .await
            }
            None => String::new(),
        }
    }

    async fn call_hook(
        &self,
        ctx: &mut InterpreterContext,
        command: &mut dyn Command,
        parsed: &ParsedCommand,
        stdin: Option<&str>,
        event: PipelineEvent,
    ) -> Result<ExecResult> {
        let mut scoped;
        let env = if parsed.env_overrides.is_empty() {
            &mut ctx.env
        } else {
            scoped = ctx.env.clone();
            scoped.extend(parsed.env_overrides.iter().cloned());
            &mut scoped
        };

        let cmd_ctx = Context {
            name: &parsed.name,
            args: &parsed.args,
            env,
            cwd: &mut ctx.cwd,
            fs: Arc::clone(&self.fs),
            stdin,
            interactive: ctx.interactive,
            config: &self.config,
        };

        match event {
            PipelineEvent::Start => command.start(cmd_ctx).await,
            PipelineEvent::Line(line) => command.line_received(cmd_ctx, &line).await,
            PipelineEvent::Eof => command.eof_received(cmd_ctx).await,
            PipelineEvent::ShellExited | PipelineEvent::Timer => Ok(ExecResult::default()),
        }
    }

    /// Run a script in a nested context fed `input`, sending its output
    /// through `sink`.
    async fn run_into(
        &self,
        ctx: &InterpreterContext,
        script: &str,
        input: Option<&str>,
        env: &[(String, String)],
        sink: &mut StageSink,
    ) {
        let (stdout, stderr) = match self.run_captured(ctx, script, input, env).await {
            Ok(output) => output,
            Err(e) => (String::new(), format!("-bash: {}\n", e)),
        };
        for (fd, data) in [(1, stdout), (2, stderr)] {
            if let Err(e) = sink.deliver_output(fd, &data).await {
                ctx.console.error_write(e.shell_message().as_bytes());
                return;
            }
        }
    }
}
