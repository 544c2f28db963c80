//! Environment commands (export, env)

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;
use crate::parser::is_valid_name;

/// The export command - set variables in the context environment.
///
/// Without arguments, prints the environment in `declare -x` form.
pub struct Export;

#[async_trait]
impl Command for Export {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() || ctx.args.iter().all(|a| a == "-p") {
            let mut vars: Vec<_> = ctx.env.iter().collect();
            vars.sort();
            let listing: String = vars
                .into_iter()
                .map(|(k, v)| format!("declare -x {}=\"{}\"\n", k, v))
                .collect();
            return Ok(ExecResult::ok(listing));
        }

        let mut stderr = String::new();
        for arg in ctx.args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg.as_str(), None),
            };
            if !is_valid_name(name) {
                stderr.push_str(&format!("-bash: export: `{}': not a valid identifier\n", arg));
                continue;
            }
            if let Some(value) = value {
                ctx.env.insert(name.to_string(), value.to_string());
            }
        }

        if stderr.is_empty() {
            Ok(ExecResult::ok(""))
        } else {
            Ok(ExecResult::err(stderr, 1))
        }
    }
}

/// The env command - print the environment.
pub struct Env;

#[async_trait]
impl Command for Env {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut vars: Vec<_> = ctx.env.iter().collect();
        vars.sort();
        let output: String = vars
            .into_iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect();
        Ok(ExecResult::ok(output))
    }
}
