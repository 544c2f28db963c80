//! Token types for the lexer

use std::ops::Range;

/// One piece of a word, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Plain text. `quoted` is set for single/double-quoted or
    /// backslash-escaped text, which is never glob-expanded or split.
    Literal { text: String, quoted: bool },

    /// `$NAME`, `${NAME}` or `$?`
    Variable { name: String, quoted: bool },

    /// `$(...)` or backtick substitution; `script` is the raw inner text.
    Substitution { script: String, quoted: bool },
}

impl WordPart {
    pub fn is_quoted(&self) -> bool {
        match self {
            WordPart::Literal { quoted, .. }
            | WordPart::Variable { quoted, .. }
            | WordPart::Substitution { quoted, .. } => *quoted,
        }
    }
}

/// A shell word: a sequence of literal, variable and substitution parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    /// An unquoted literal word.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal {
                text: text.into(),
                quoted: false,
            }],
        }
    }

    /// Append literal text, merging with a preceding literal of the same
    /// quoting.
    pub(crate) fn push_literal(&mut self, text: &str, quoted: bool) {
        if let Some(WordPart::Literal {
            text: last,
            quoted: last_quoted,
        }) = self.parts.last_mut()
        {
            if *last_quoted == quoted {
                last.push_str(text);
                return;
            }
        }
        self.parts.push(WordPart::Literal {
            text: text.to_string(),
            quoted,
        });
    }

    /// The word's text if it consists only of literal parts.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::Literal { text, .. } => out.push_str(text),
                _ => return None,
            }
        }
        Some(out)
    }

    /// Whether any part was quoted or escaped.
    pub fn is_quoted(&self) -> bool {
        self.parts.iter().any(WordPart::is_quoted)
    }

    /// A single unquoted literal made of ASCII digits, e.g. the `2` in `2>`.
    pub fn is_digits(&self) -> bool {
        match self.parts.as_slice() {
            [WordPart::Literal { text, quoted: false }] => {
                !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
            }
            _ => false,
        }
    }

    /// Whether this is exactly the unquoted literal `text`.
    pub fn is_plain(&self, text: &str) -> bool {
        matches!(
            self.parts.as_slice(),
            [WordPart::Literal { text: t, quoted: false }] if t == text
        )
    }

    /// Split a `NAME=value` assignment. The name and `=` must be unquoted
    /// literal text at the start of the word.
    pub fn split_assignment(&self) -> Option<(String, Word)> {
        let Some(WordPart::Literal {
            text,
            quoted: false,
        }) = self.parts.first()
        else {
            return None;
        };
        let eq = text.find('=')?;
        let name = &text[..eq];
        if !is_valid_name(name) {
            return None;
        }

        let mut value = Word::default();
        let rest = &text[eq + 1..];
        if !rest.is_empty() {
            value.push_literal(rest, false);
        }
        value.parts.extend(self.parts[1..].iter().cloned());
        Some((name.to_string(), value))
    }
}

/// Whether `name` is a valid shell variable name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word (command name, argument, redirection target)
    Word(Word),

    /// An operator: `;`, `;;`, `|`, `||`, `&`, `&&`, `>`, `>>`, `>&`, `<`,
    /// `(`, `)`, newline, or a merged redirection such as `2>&1`
    Op(String),

    /// End of input
    Eof,
}

/// A token with its source byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// No whitespace separated this token from the previous one.
    pub glued: bool,
    pub span: Range<usize>,
}

impl Token {
    pub fn word(word: Word, glued: bool) -> Self {
        Self {
            kind: TokenKind::Word(word),
            glued,
            span: 0..0,
        }
    }

    pub fn op(op: impl Into<String>, glued: bool) -> Self {
        Self {
            kind: TokenKind::Op(op.into()),
            glued,
            span: 0..0,
        }
    }

    pub fn as_op(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_word(&self) -> Option<&Word> {
        match &self.kind {
            TokenKind::Word(word) => Some(word),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        let (name, value) = Word::literal("FOO=bar").split_assignment().unwrap();
        assert_eq!(name, "FOO");
        assert_eq!(value.as_literal().unwrap(), "bar");

        assert!(Word::literal("1FOO=bar").split_assignment().is_none());
        assert!(Word::literal("foo").split_assignment().is_none());

        let quoted = Word {
            parts: vec![WordPart::Literal {
                text: "A=b".to_string(),
                quoted: true,
            }],
        };
        assert!(quoted.split_assignment().is_none());
    }

    #[test]
    fn test_assignment_keeps_quoted_value() {
        let word = Word {
            parts: vec![
                WordPart::Literal {
                    text: "A=".to_string(),
                    quoted: false,
                },
                WordPart::Literal {
                    text: "x y".to_string(),
                    quoted: true,
                },
            ],
        };
        let (name, value) = word.split_assignment().unwrap();
        assert_eq!(name, "A");
        assert_eq!(value.as_literal().unwrap(), "x y");
        assert!(value.is_quoted());
    }

    #[test]
    fn test_is_digits() {
        assert!(Word::literal("2").is_digits());
        assert!(!Word::literal("2a").is_digits());
        assert!(!Word::literal("").is_digits());
    }
}
