//! Word expansion
//!
//! Turns lexed words into arguments: tilde, `$NAME`, `$?` and command
//! substitution. Substitutions run in nested non-interactive contexts
//! while the statement that contains them is being compiled. Globbing is
//! left to dispatch since it applies only after redirections are pulled
//! out.

use super::context::InterpreterContext;
use super::Runtime;
use crate::fs::has_glob_chars;
use crate::parser::{Arg, Token, TokenKind, Word, WordPart};

/// Fields produced from one word.
struct Fields {
    done: Vec<Arg>,
    text: String,
    glob: bool,
    quoted: bool,
    glued: bool,
}

impl Fields {
    fn new(glued: bool) -> Self {
        Self {
            done: Vec::new(),
            text: String::new(),
            glob: false,
            quoted: false,
            glued,
        }
    }

    fn push(&mut self, text: &str, quoted: bool) {
        self.text.push_str(text);
        if quoted {
            self.quoted = true;
        } else if has_glob_chars(text) {
            self.glob = true;
        }
    }

    /// End the current field. Empty unquoted fields vanish.
    fn split(&mut self) {
        if !self.text.is_empty() || self.quoted {
            self.done.push(Arg::Word {
                text: std::mem::take(&mut self.text),
                glob: self.glob,
                glued: self.glued,
            });
        }
        self.glob = false;
        self.quoted = false;
        self.glued = false;
    }

    fn finish(mut self) -> Vec<Arg> {
        self.split();
        self.done
    }
}

fn variable(ctx: &InterpreterContext, name: &str) -> String {
    if name == "?" {
        return "0".to_string();
    }
    ctx.env.get(name).cloned().unwrap_or_default()
}

/// `~` or `~/...` at the start of a word: the home directory and the
/// text after the tilde.
fn tilde_prefix<'a>(ctx: &'a InterpreterContext, text: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = text.strip_prefix('~')?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let home = ctx.env.get("HOME")?;
    Some((home.as_str(), rest))
}

impl Runtime {
    /// Run a substitution script and return its output minus trailing
    /// newlines. Its stderr goes to the enclosing console.
    pub(crate) async fn substitute(&self, ctx: &InterpreterContext, script: &str) -> String {
        match self.run_captured(ctx, script, None, &[]).await {
            Ok((stdout, stderr)) => {
                if !stderr.is_empty() {
                    ctx.console.error_write(stderr.as_bytes());
                }
                stdout.trim_end_matches('\n').to_string()
            }
            Err(e) => {
                ctx.console.error_write(format!("-bash: {}\n", e).as_bytes());
                String::new()
            }
        }
    }

    /// Expand one word into zero or more arguments.
    pub(crate) async fn expand_word(
        &self,
        ctx: &InterpreterContext,
        word: &Word,
        glued: bool,
    ) -> Vec<Arg> {
        let mut fields = Fields::new(glued);

        for (index, part) in word.parts.iter().enumerate() {
            match part {
                WordPart::Literal { text, quoted } => {
                    match tilde_prefix(ctx, text).filter(|_| index == 0 && !quoted) {
                        // The home directory is never globbed, the rest may be
                        Some((home, rest)) => {
                            fields.push(home, true);
                            fields.push(rest, false);
                        }
                        None => fields.push(text, *quoted),
                    }
                }
                WordPart::Variable { name, quoted } => {
                    let value = variable(ctx, name);
                    fields.text.push_str(&value);
                    if *quoted {
                        fields.quoted = true;
                    }
                }
                WordPart::Substitution { script, quoted } => {
                    let output = self.substitute(ctx, script).await;
                    if *quoted {
                        fields.push(&output, true);
                        continue;
                    }
                    if output.starts_with(char::is_whitespace) {
                        fields.split();
                    }
                    for (n, piece) in output.split_whitespace().enumerate() {
                        if n > 0 {
                            fields.split();
                        }
                        fields.push(piece, false);
                    }
                    if output.ends_with(char::is_whitespace) {
                        fields.split();
                    }
                }
            }
        }

        fields.finish()
    }

    /// Expand a word into a single string without splitting, as for the
    /// value of an assignment.
    pub(crate) async fn expand_joined(&self, ctx: &InterpreterContext, word: &Word) -> String {
        let mut out = String::new();
        for (index, part) in word.parts.iter().enumerate() {
            match part {
                WordPart::Literal { text, quoted } => {
                    match tilde_prefix(ctx, text).filter(|_| index == 0 && !quoted) {
                        Some((home, rest)) => {
                            out.push_str(home);
                            out.push_str(rest);
                        }
                        None => out.push_str(text),
                    }
                }
                WordPart::Variable { name, .. } => out.push_str(&variable(ctx, name)),
                WordPart::Substitution { script, .. } => {
                    out.push_str(&self.substitute(ctx, script).await)
                }
            }
        }
        out
    }

    /// Expand a stage's tokens in order. Operators pass through unchanged.
    pub(crate) async fn expand_tokens(
        &self,
        ctx: &InterpreterContext,
        tokens: impl IntoIterator<Item = Token> + Send,
    ) -> Vec<Arg> {
        let mut args = Vec::new();
        for token in tokens {
            match token.kind {
                TokenKind::Word(word) => {
                    args.extend(self.expand_word(ctx, &word, token.glued).await)
                }
                TokenKind::Op(text) => args.push(Arg::Op {
                    text,
                    glued: token.glued,
                }),
                TokenKind::Eof => {}
            }
        }
        args
    }
}
