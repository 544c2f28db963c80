//! echo command

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::Result;
use crate::interpreter::ExecResult;

/// The echo command.
pub struct Echo;

#[async_trait]
impl Command for Echo {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut add_newline = true;
        let mut interpret_escapes = false;
        let mut args_iter = ctx.args.iter().peekable();

        // Leading option words; anything else starts the text
        while let Some(arg) = args_iter.peek() {
            let Some(flags) = arg.strip_prefix('-') else {
                break;
            };
            if flags.is_empty() || !flags.chars().all(|c| matches!(c, 'n' | 'e' | 'E')) {
                break;
            }
            for flag in flags.chars() {
                match flag {
                    'n' => add_newline = false,
                    'e' => interpret_escapes = true,
                    _ => interpret_escapes = false,
                }
            }
            args_iter.next();
        }

        let mut output = String::new();
        for (i, arg) in args_iter.enumerate() {
            if i > 0 {
                output.push(' ');
            }
            if interpret_escapes {
                let (text, stop) = interpret_escape_sequences(arg);
                output.push_str(&text);
                if stop {
                    return Ok(ExecResult::ok(output));
                }
            } else {
                output.push_str(arg);
            }
        }

        if add_newline {
            output.push('\n');
        }

        Ok(ExecResult::ok(output))
    }
}

/// Expand backslash escapes. The flag is set when `\c` cut the output short.
fn interpret_escape_sequences(s: &str) -> (String, bool) {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('a') => result.push('\x07'),
            Some('b') => result.push('\x08'),
            Some('e') => result.push('\x1b'),
            Some('f') => result.push('\x0c'),
            Some('v') => result.push('\x0b'),
            Some('0') => {
                // \0nnn
                let mut value = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                result.push(char::from_u32(value & 0xff).unwrap_or('\0'));
            }
            Some('x') => {
                // \xHH
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|d| d.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    result.push_str("\\x");
                } else {
                    result.push(char::from_u32(value).unwrap_or('\0'));
                }
            }
            Some('c') => return (result, true),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    (result, false)
}
