//! Sleep command - pause for a specified duration

use async_trait::async_trait;
use std::time::Duration;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::{ExecResult, Flow};

/// The sleep command - pause for a number of seconds.
///
/// Usage: sleep NUMBER[SUFFIX]...
///
/// Suffixes `s`, `m`, `h` and `d` are accepted. The total is capped by
/// [`Limits::max_sleep`](crate::Limits::max_sleep). The wait itself is a
/// [`Flow::Wait`], so Ctrl-C at an interactive prompt cancels it.
#[derive(Default)]
pub struct Sleep;

fn parse_interval(arg: &str) -> Option<f64> {
    let (number, factor) = match arg.chars().last()? {
        's' => (&arg[..arg.len() - 1], 1.0),
        'm' => (&arg[..arg.len() - 1], 60.0),
        'h' => (&arg[..arg.len() - 1], 3600.0),
        'd' => (&arg[..arg.len() - 1], 86400.0),
        _ => (arg, 1.0),
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value * factor)
}

#[async_trait]
impl Command for Sleep {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        if ctx.args.is_empty() {
            return Ok(ExecResult::err(
                "sleep: missing operand\nTry 'sleep --help' for more information.\n",
                1,
            ));
        }

        let mut total = 0.0;
        for arg in ctx.args {
            match parse_interval(arg) {
                Some(seconds) => total += seconds,
                None => {
                    return Ok(ExecResult::err(
                        format!(
                            "sleep: invalid time interval '{}'\nTry 'sleep --help' for more information.\n",
                            arg
                        ),
                        1,
                    ));
                }
            }
        }

        let limit = ctx.config.limits.max_sleep_duration();
        let duration = Duration::from_secs_f64(total).min(limit);
        if duration.is_zero() {
            return Ok(ExecResult::ok(""));
        }
        Ok(ExecResult::ok("").flow(Flow::Wait(duration)))
    }
}
