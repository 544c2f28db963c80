//! Redirection and file-descriptor parsing
//!
//! Redirections are handled in two passes. Before expansion,
//! [`merge_redirection_tokens`] glues split operator tokens back together
//! (`2` `>&` `1` becomes `2>&1`). After expansion, [`parse_redirections`]
//! pulls the operators and their targets out of the argument list.

use regex::Regex;
use std::sync::LazyLock;

use super::tokens::{Token, TokenKind};

static REDIRECTION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d*)(>>|>&|>|<)(.*)$").ok());

/// Merge adjacent tokens that together form one redirection operator.
///
/// - a glued all-digit word followed by `>`, `>>` or `>&` becomes `N>`, `N>>`, `N>&`
/// - `>` followed by a glued `&` becomes `>&`
/// - `>&` (with or without fd) followed by a glued digit word or `-` absorbs it
///
/// Only tokens without whitespace between them are merged, so `echo 2 > f`
/// keeps `2` as an argument. Applying the merge twice gives the same result.
pub fn merge_redirection_tokens(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        if !token.glued {
            out.push(token);
            continue;
        }
        let Some(last) = out.last_mut() else {
            out.push(token);
            continue;
        };

        let merged = match (&last.kind, &token.kind) {
            (TokenKind::Word(word), TokenKind::Op(op))
                if word.is_digits() && matches!(op.as_str(), ">" | ">>" | ">&") =>
            {
                word.as_literal().map(|digits| format!("{}{}", digits, op))
            }
            (TokenKind::Op(prev), TokenKind::Op(op)) if op == "&" && is_fd_write(prev) => {
                Some(format!("{}&", prev))
            }
            (TokenKind::Op(prev), TokenKind::Word(word))
                if is_fd_dup(prev) && (word.is_digits() || word.is_plain("-")) =>
            {
                word.as_literal().map(|target| format!("{}{}", prev, target))
            }
            _ => None,
        };

        match merged {
            Some(op) => {
                last.kind = TokenKind::Op(op);
                last.span = last.span.start..token.span.end.max(last.span.end);
            }
            None => out.push(token),
        }
    }

    out
}

/// `>` or `N>`
fn is_fd_write(op: &str) -> bool {
    op.strip_suffix('>')
        .is_some_and(|fd| fd.bytes().all(|b| b.is_ascii_digit()))
}

/// `>&` or `N>&`
fn is_fd_dup(op: &str) -> bool {
    op.strip_suffix(">&")
        .is_some_and(|fd| fd.bytes().all(|b| b.is_ascii_digit()))
}

/// A command-line argument after expansion.
///
/// Operators stay distinguishable from words so that quoted text such as
/// `">"` is never taken for a redirection.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Word {
        text: String,
        /// Contains unquoted wildcard characters
        glob: bool,
        glued: bool,
    },
    Op {
        text: String,
        glued: bool,
    },
}

impl Arg {
    /// A word with no wildcards.
    pub fn word(text: impl Into<String>) -> Self {
        Arg::Word {
            text: text.into(),
            glob: false,
            glued: false,
        }
    }

    pub fn op(text: impl Into<String>) -> Self {
        Arg::Op {
            text: text.into(),
            glued: false,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Arg::Word { text, .. } | Arg::Op { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Arg::Word { text, .. } | Arg::Op { text, .. } => text,
        }
    }

    pub fn glued(&self) -> bool {
        match self {
            Arg::Word { glued, .. } | Arg::Op { glued, .. } => *glued,
        }
    }

    pub fn is_op(&self, op: &str) -> bool {
        matches!(self, Arg::Op { text, .. } if text == op)
    }
}

/// One structured redirection.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectionOp {
    /// `N> path`
    FileWrite { fd: u32, path: String },
    /// `N>> path`
    FileAppend { fd: u32, path: String },
    /// `N< path`
    Stdin { fd: u32, path: String },
    /// `N>&M`
    FdDup { fd: u32, target: u32 },
    /// `N>&-`
    FdClose { fd: u32 },
}

/// Extract redirections from an expanded argument list.
///
/// Returns the remaining arguments and the redirections in input order. An
/// operator without a following target is left in the argument list.
pub fn parse_redirections(args: Vec<Arg>) -> (Vec<Arg>, Vec<RedirectionOp>) {
    let mut cleaned = Vec::with_capacity(args.len());
    let mut ops = Vec::new();
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        let Arg::Op { text, glued } = &arg else {
            cleaned.push(arg);
            continue;
        };
        let Some(caps) = REDIRECTION.as_ref().and_then(|re| re.captures(text)) else {
            cleaned.push(arg);
            continue;
        };
        let fd_text = caps.get(1).map_or("", |m| m.as_str());
        let operator = caps.get(2).map_or("", |m| m.as_str());
        let inline = caps.get(3).map_or("", |m| m.as_str());

        let default_fd = if operator == "<" { 0 } else { 1 };
        let fd = if fd_text.is_empty() {
            default_fd
        } else {
            match fd_text.parse::<u32>() {
                Ok(fd) => fd,
                Err(_) => {
                    cleaned.push(arg);
                    continue;
                }
            }
        };

        // Target is either merged into the operator or the next word
        let (target, target_glued) = if !inline.is_empty() {
            (inline.to_string(), true)
        } else if let Some(next) = iter.next_if(|a| matches!(a, Arg::Word { .. })) {
            let glued = next.glued();
            (next.into_text(), glued)
        } else {
            cleaned.push(arg);
            continue;
        };

        match operator {
            ">" => ops.push(RedirectionOp::FileWrite { fd, path: target }),
            ">>" => ops.push(RedirectionOp::FileAppend { fd, path: target }),
            "<" => ops.push(RedirectionOp::Stdin { fd, path: target }),
            _ => {
                if target == "-" {
                    ops.push(RedirectionOp::FdClose { fd });
                } else if let Some(dup) = target
                    .parse::<u32>()
                    .ok()
                    .filter(|_| target.bytes().all(|b| b.is_ascii_digit()))
                {
                    ops.push(RedirectionOp::FdDup { fd, target: dup });
                } else if target_glued {
                    cleaned.push(Arg::Word {
                        text: format!("{}{}", text, target),
                        glob: false,
                        glued: *glued,
                    });
                } else {
                    cleaned.push(Arg::Word {
                        text: text.clone(),
                        glob: false,
                        glued: *glued,
                    });
                    cleaned.push(Arg::word(target));
                }
            }
        }
    }

    (cleaned, ops)
}
