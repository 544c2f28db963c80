//! Static text and script commands

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::{ExecResult, Flow};

/// A command that prints a fixed text, such as `/usr/bin/nproc`.
pub struct TextCommand {
    text: String,
}

impl TextCommand {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Command for TextCommand {
    async fn start(&mut self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(self.text.clone()))
    }
}

/// A plain-text virtual file executed by path; its content runs in a
/// nested non-interactive context.
pub struct ScriptCommand {
    script: String,
}

impl ScriptCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl Command for ScriptCommand {
    async fn start(&mut self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok("").flow(Flow::Script(std::mem::take(&mut self.script))))
    }
}
