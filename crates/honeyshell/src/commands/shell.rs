//! Shell commands (sh, bash)

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::{Result, io_reason};
use crate::interpreter::{ExecResult, Flow};

/// The sh / bash command.
///
/// `sh -c TEXT`, `sh FILE` and `... | sh` run a script in a nested
/// context; a bare `sh` at an interactive prompt starts a nested shell.
pub struct Sh;

#[async_trait]
impl Command for Sh {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut args = ctx.args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => {
                    return match args.next() {
                        Some(script) => Ok(ExecResult::ok("").flow(Flow::Script(script.clone()))),
                        None => Ok(ExecResult::err(
                            format!("{}: -c: option requires an argument\n", ctx.name),
                            2,
                        )),
                    };
                }
                // Options that do not change what runs
                "-i" | "-l" | "-s" | "-e" | "-x" | "--login" | "--norc" | "--noprofile" => {}
                file => {
                    let path = ctx.resolve(file);
                    return match ctx.fs.read_file(&path).await {
                        Ok(content) => {
                            let script = String::from_utf8_lossy(&content).into_owned();
                            Ok(ExecResult::ok("").flow(Flow::Script(script)))
                        }
                        Err(e) => Ok(ExecResult::err(
                            format!("{}: {}: {}\n", ctx.name, file, io_reason(&e)),
                            127,
                        )),
                    };
                }
            }
        }

        match ctx.stdin {
            Some(input) => Ok(ExecResult::ok("").flow(Flow::InputScript(input.to_string()))),
            None if ctx.interactive => Ok(ExecResult::ok("").flow(Flow::Shell)),
            None => Ok(ExecResult::ok("")),
        }
    }
}
