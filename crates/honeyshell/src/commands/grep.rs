//! grep - Pattern matching command
//!
//! Implements grep functionality using the regex crate.
//!
//! Usage:
//!   grep pattern file
//!   echo "text" | grep pattern
//!   grep -i pattern file        # case insensitive
//!   grep -v pattern file        # invert match
//!   grep -n pattern file        # show line numbers
//!   grep -c pattern file        # count matches
//!   grep -o pattern file        # only show matching part
//!   grep -l pattern file1 file2 # list matching files
//!   grep -F pattern file        # fixed string match

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use super::{Command, Context};
use crate::error::{Result, io_reason};
use crate::interpreter::ExecResult;

const USAGE: &str =
    "Usage: grep [OPTION]... PATTERNS [FILE]...\nTry 'grep --help' for more information.\n";

/// grep command - pattern matching
///
/// With no file and no piped input it filters client lines until
/// end-of-input.
#[derive(Default)]
pub struct Grep {
    interactive: Option<(GrepOptions, Regex)>,
}

#[derive(Default)]
struct GrepOptions {
    pattern: Option<String>,
    files: Vec<String>,
    ignore_case: bool,
    invert_match: bool,
    line_numbers: bool,
    count_only: bool,
    files_with_matches: bool,
    fixed_strings: bool,
    only_matching: bool,
    word_regex: bool,
}

impl GrepOptions {
    fn parse(args: &[String]) -> std::result::Result<Self, String> {
        let mut opts = GrepOptions::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            if arg == "--" {
                positional.extend(args[i + 1..].iter().cloned());
                break;
            } else if arg.starts_with('-') && arg.len() > 1 && !arg.starts_with("--") {
                // Combined flags like -iv
                for c in arg[1..].chars() {
                    match c {
                        'i' => opts.ignore_case = true,
                        'v' => opts.invert_match = true,
                        'n' => opts.line_numbers = true,
                        'c' => opts.count_only = true,
                        'l' => opts.files_with_matches = true,
                        'o' => opts.only_matching = true,
                        'w' => opts.word_regex = true,
                        'F' => opts.fixed_strings = true,
                        'E' | 'G' | 's' | 'q' | 'r' | 'H' | 'h' => {}
                        'e' => {
                            i += 1;
                            match args.get(i) {
                                Some(p) => opts.pattern = Some(p.clone()),
                                None => {
                                    return Err(format!(
                                        "grep: option requires an argument -- 'e'\n{}",
                                        USAGE
                                    ));
                                }
                            }
                        }
                        other => {
                            return Err(format!("grep: invalid option -- '{}'\n{}", other, USAGE));
                        }
                    }
                }
            } else {
                positional.push(arg.clone());
            }
            i += 1;
        }

        if opts.pattern.is_none() {
            if positional.is_empty() {
                return Err(USAGE.to_string());
            }
            opts.pattern = Some(positional.remove(0));
        }
        opts.files = positional;

        Ok(opts)
    }

    fn build_regex(&self) -> std::result::Result<Regex, String> {
        let pattern = self.pattern.as_deref().unwrap_or_default();
        let pattern = if self.fixed_strings {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        let pattern = if self.word_regex {
            format!(r"\b{}\b", pattern)
        } else {
            pattern
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|_| "grep: Unmatched ( or \\(\n".to_string())
    }

    /// Filter one input. Returns the output and whether anything matched.
    fn scan(&self, regex: &Regex, filename: &str, content: &str, show_filename: bool) -> (String, bool) {
        let mut output = String::new();
        let mut match_count = 0;

        for (line_num, line) in content.lines().enumerate() {
            let prefix = {
                let mut p = String::new();
                if show_filename {
                    p.push_str(filename);
                    p.push(':');
                }
                if self.line_numbers {
                    p.push_str(&format!("{}:", line_num + 1));
                }
                p
            };

            if self.only_matching && !self.invert_match {
                for mat in regex.find_iter(line) {
                    match_count += 1;
                    if !self.count_only && !self.files_with_matches {
                        output.push_str(&prefix);
                        output.push_str(mat.as_str());
                        output.push('\n');
                    }
                }
                continue;
            }

            if regex.is_match(line) != self.invert_match {
                match_count += 1;
                if self.files_with_matches {
                    break;
                }
                if !self.count_only {
                    output.push_str(&prefix);
                    output.push_str(line);
                    output.push('\n');
                }
            }
        }

        if self.files_with_matches {
            if match_count > 0 {
                output = format!("{}\n", filename);
            }
        } else if self.count_only {
            output = if show_filename {
                format!("{}:{}\n", filename, match_count)
            } else {
                format!("{}\n", match_count)
            };
        }

        (output, match_count > 0)
    }
}

#[async_trait]
impl Command for Grep {
    async fn start(&mut self, ctx: Context<'_>) -> Result<ExecResult> {
        let opts = match GrepOptions::parse(ctx.args) {
            Ok(opts) => opts,
            Err(usage) => return Ok(ExecResult::err(usage, 2)),
        };
        let regex = match opts.build_regex() {
            Ok(regex) => regex,
            Err(msg) => return Ok(ExecResult::err(msg, 2)),
        };

        if opts.files.is_empty() {
            let Some(stdin) = ctx.stdin else {
                self.interactive = Some((opts, regex));
                return Ok(ExecResult::await_input(""));
            };
            let (output, matched) = opts.scan(&regex, "(standard input)", stdin, false);
            return Ok(ExecResult::with_code(output, if matched { 0 } else { 1 }));
        }

        let show_filename = opts.files.len() > 1;
        let mut output = String::new();
        let mut errors = String::new();
        let mut any_match = false;

        for file in &opts.files {
            let path = ctx.resolve(file);
            match ctx.fs.read_file(&path).await {
                Ok(content) => {
                    let text = String::from_utf8_lossy(&content);
                    let (out, matched) = opts.scan(&regex, file, &text, show_filename);
                    output.push_str(&out);
                    any_match |= matched;
                }
                Err(e) => errors.push_str(&format!("grep: {}: {}\n", file, io_reason(&e))),
            }
        }

        let exit_code = if !errors.is_empty() {
            2
        } else if any_match {
            0
        } else {
            1
        };
        Ok(ExecResult {
            stdout: output,
            stderr: errors,
            exit_code,
            ..ExecResult::default()
        })
    }

    async fn line_received(&mut self, _ctx: Context<'_>, line: &str) -> Result<ExecResult> {
        let output = match &self.interactive {
            Some((opts, regex)) if !opts.count_only && !opts.files_with_matches => {
                opts.scan(regex, "(standard input)", line, false).0
            }
            _ => String::new(),
        };
        Ok(ExecResult::await_input(output))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::testing::TestEnv;
    use crate::fs::InMemoryFs;

    async fn run_grep(args: &[&str], stdin: Option<&str>) -> ExecResult {
        let mut env = TestEnv::new(args);
        Grep::default().start(env.ctx("grep", stdin)).await.unwrap()
    }

    #[tokio::test]
    async fn test_grep_basic() {
        let result = run_grep(&["hello"], Some("hello world\ngoodbye world")).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn test_grep_no_match() {
        let result = run_grep(&["xyz"], Some("hello world\ngoodbye world")).await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.stdout, "");
    }

    #[tokio::test]
    async fn test_grep_case_insensitive_invert() {
        let result = run_grep(&["-iv", "HELLO"], Some("Hello\nworld\n")).await;
        assert_eq!(result.stdout, "world\n");
    }

    #[tokio::test]
    async fn test_grep_line_numbers_and_count() {
        let result = run_grep(&["-n", "world"], Some("hello\nworld\nfoo")).await;
        assert_eq!(result.stdout, "2:world\n");

        let result = run_grep(&["-c", "o"], Some("hello\nworld\nfoo")).await;
        assert_eq!(result.stdout, "3\n");
    }

    #[tokio::test]
    async fn test_grep_fixed_and_only_matching() {
        let result = run_grep(&["-F", "a.b"], Some("a.b\naxb\n")).await;
        assert_eq!(result.stdout, "a.b\n");

        let result = run_grep(&["-o", "o"], Some("hello world\n")).await;
        assert_eq!(result.stdout, "o\no\n");
    }

    #[tokio::test]
    async fn test_grep_files() {
        let fs = InMemoryFs::new()
            .with_file("/root/a", "root:x\n")
            .with_file("/root/b", "user:x\n");
        let mut env = TestEnv::new(&["root", "a", "b", "c"]).with_fs(fs);
        let result = Grep::default().start(env.ctx("grep", None)).await.unwrap();
        assert_eq!(result.stdout, "a:root:x\n");
        assert_eq!(result.stderr, "grep: c: No such file or directory\n");
        assert_eq!(result.exit_code, 2);
    }

    #[tokio::test]
    async fn test_grep_missing_pattern() {
        let result = run_grep(&[], None).await;
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.starts_with("Usage: grep"));
    }

    #[tokio::test]
    async fn test_grep_interactive_filter() {
        let mut env = TestEnv::new(&["ab"]);
        let mut grep = Grep::default();
        grep.start(env.ctx("grep", None)).await.unwrap();
        let hit = grep.line_received(env.ctx("grep", None), "xaby").await.unwrap();
        assert_eq!(hit.stdout, "xaby\n");
        let miss = grep.line_received(env.ctx("grep", None), "zzz").await.unwrap();
        assert_eq!(miss.stdout, "");
    }
}
