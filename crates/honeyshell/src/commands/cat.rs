//! cat command

use async_trait::async_trait;

use super::{Command, Context};
use crate::error::{Result, io_reason};
use crate::interpreter::ExecResult;

/// The cat command.
///
/// Without file arguments or piped input it echoes client lines back
/// until end-of-input.
#[derive(Default)]
pub struct Cat {
    number_lines: bool,
    line_no: usize,
}

impl Cat {
    fn render(&mut self, text: &str) -> String {
        if !self.number_lines {
            return text.to_string();
        }
        let mut out = String::new();
        for line in text.split_inclusive('\n') {
            self.line_no += 1;
            out.push_str(&format!("{:>6}\t{}", self.line_no, line));
        }
        out
    }
}

#[async_trait]
impl Command for Cat {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let mut files: Vec<&str> = Vec::new();

        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 {
                for ch in arg[1..].chars() {
                    match ch {
                        'n' => self.number_lines = true,
                        'A' | 'e' | 'E' | 't' | 'T' | 'v' | 's' | 'u' => {}
                        _ => {
                            return Ok(ExecResult::err(
                                format!(
                                    "cat: invalid option -- '{}'\nTry 'cat --help' for more information.\n",
                                    ch
                                ),
                                1,
                            ));
                        }
                    }
                }
            } else {
                files.push(arg);
            }
        }

        if files.is_empty() {
            return match ctx.stdin {
                Some(stdin) => Ok(ExecResult::ok(self.render(stdin))),
                None => Ok(ExecResult::await_input("")),
            };
        }

        let mut raw = String::new();
        let mut errors = String::new();
        for file in files {
            if file == "-" {
                raw.push_str(ctx.stdin.unwrap_or(""));
                continue;
            }
            let path = ctx.resolve(file);
            match ctx.fs.read_file(&path).await {
                Ok(content) => raw.push_str(&String::from_utf8_lossy(&content)),
                Err(e) => errors.push_str(&format!("cat: {}: {}\n", file, io_reason(&e))),
            }
        }

        Ok(ExecResult {
            stdout: self.render(&raw),
            exit_code: if errors.is_empty() { 0 } else { 1 },
            stderr: errors,
            ..ExecResult::default()
        })
    }

    async fn line_received(&mut self, _ctx: Context<'_>, line: &str) -> Result<ExecResult> {
        let echoed = self.render(&format!("{}\n", line));
        Ok(ExecResult::await_input(echoed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Flow;
    use crate::commands::testing::TestEnv;
    use crate::fs::InMemoryFs;

    #[tokio::test]
    async fn test_cat_file() {
        let mut env = TestEnv::new(&["notes.txt"])
            .with_fs(InMemoryFs::new().with_file("/root/notes.txt", "a\nb\n"));
        let result = Cat::default().start(env.ctx("cat", None)).await.unwrap();
        assert_eq!(result.stdout, "a\nb\n");
    }

    #[tokio::test]
    async fn test_cat_missing_file() {
        let mut env = TestEnv::new(&["nope"]);
        let result = Cat::default().start(env.ctx("cat", None)).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.stderr, "cat: nope: No such file or directory\n");
    }

    #[tokio::test]
    async fn test_cat_stdin_numbered() {
        let mut env = TestEnv::new(&["-n"]);
        let result = Cat::default()
            .start(env.ctx("cat", Some("x\ny\n")))
            .await
            .unwrap();
        assert_eq!(result.stdout, "     1\tx\n     2\ty\n");
    }

    #[tokio::test]
    async fn test_cat_interactive_echo() {
        let mut env = TestEnv::new(&[]);
        let mut cat = Cat::default();
        let started = cat.start(env.ctx("cat", None)).await.unwrap();
        assert_eq!(started.flow, Flow::AwaitInput);

        let echoed = cat.line_received(env.ctx("cat", None), "hi").await.unwrap();
        assert_eq!(echoed.stdout, "hi\n");
        assert_eq!(echoed.flow, Flow::AwaitInput);

        let done = cat.eof_received(env.ctx("cat", None)).await.unwrap();
        assert_eq!(done.flow, Flow::Done);
    }
}
