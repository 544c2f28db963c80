//! Flow control commands (true, false, exit)

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::{ExecResult, Flow};

/// The true command - always returns 0.
pub struct True;

#[async_trait]
impl Command for True {
    async fn start(&mut self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::ok(""))
    }
}

/// The false command - always returns 1.
pub struct False;

#[async_trait]
impl Command for False {
    async fn start(&mut self, _ctx: Context<'_>) -> Result<ExecResult> {
        Ok(ExecResult::with_code("", 1))
    }
}

/// The exit / logout command - ends the current shell.
pub struct Exit;

#[async_trait]
impl Command for Exit {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let exit_code = ctx
            .args
            .first()
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);

        Ok(ExecResult::with_code("", exit_code).flow(Flow::Exit))
    }
}
