//! Lexer for shell input lines
//!
//! Tokenizes one line of input into quote-aware words and operators. Command
//! substitutions are not lexed recursively: their raw inner text is kept in
//! the word and only parsed when the substitution runs.

use super::tokens::{Token, TokenKind, Word, WordPart, is_valid_name};

/// Tokenizer failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    /// A `'` or `"` was never closed.
    #[error("syntax error: unexpected end of file")]
    UnterminatedQuote,

    /// A `$(`, backtick or `(` group was never closed.
    #[error("syntax error: unexpected end of file")]
    UnterminatedGroup,

    /// `${` without `}` or with an invalid name inside.
    #[error("{0}: bad substitution")]
    BadSubstitution(String),

    /// An operator appeared where bash does not accept one.
    #[error("syntax error near unexpected token `{0}'")]
    UnexpectedToken(String),

    /// Input ended while an operand was still expected (`echo a |`).
    #[error("syntax error: unexpected end of file")]
    UnexpectedEof,
}

impl LexError {
    /// Whether more input lines could complete the statement.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, LexError::UnterminatedQuote | LexError::UnterminatedGroup)
    }
}

/// Lexer over one input line (which may itself contain newlines).
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next unread character
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Get the next token. Returns an `Eof` token at end of input, forever.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let skipped = self.skip_whitespace();
        let glued = !skipped && self.pos > 0;

        // Comment - skip to end of line
        if self.peek_char() == Some('#') {
            while let Some(ch) = self.peek_char() {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
        }

        let start = self.pos;
        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(ch) => match self.read_operator(ch) {
                Some(op) => TokenKind::Op(op.to_string()),
                None => TokenKind::Word(self.read_word()?),
            },
        };

        Ok(Token {
            kind,
            glued,
            span: start..self.pos,
        })
    }

    /// Tokenize the whole input, including the trailing `Eof`.
    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns true when any whitespace was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                    skipped = true;
                }
                // Line continuation
                Some('\\') if self.peek_second() == Some('\n') => {
                    self.advance();
                    self.advance();
                    skipped = true;
                }
                _ => return skipped,
            }
        }
    }

    fn read_operator(&mut self, ch: char) -> Option<&'static str> {
        let op = match ch {
            '\n' => {
                self.advance();
                "\n"
            }
            ';' => {
                self.advance();
                if self.eat(';') { ";;" } else { ";" }
            }
            '|' => {
                self.advance();
                if self.eat('|') { "||" } else { "|" }
            }
            '&' => {
                self.advance();
                if self.eat('&') { "&&" } else { "&" }
            }
            '>' => {
                self.advance();
                if self.eat('>') {
                    ">>"
                } else if self.eat('&') {
                    ">&"
                } else {
                    ">"
                }
            }
            '<' => {
                self.advance();
                "<"
            }
            '(' => {
                self.advance();
                "("
            }
            ')' => {
                self.advance();
                ")"
            }
            _ => return None,
        };
        Some(op)
    }

    fn is_word_char(ch: char) -> bool {
        !matches!(
            ch,
            ' ' | '\t' | '\r' | '\n' | ';' | '|' | '&' | '>' | '<' | '(' | ')'
        )
    }

    fn read_word(&mut self) -> Result<Word, LexError> {
        let mut word = Word::default();

        while let Some(ch) = self.peek_char() {
            if !Self::is_word_char(ch) {
                break;
            }
            match ch {
                '\'' => {
                    self.advance();
                    let text = self.read_single_quoted()?;
                    word.push_literal(&text, true);
                }
                '"' => {
                    self.advance();
                    self.read_double_quoted(&mut word)?;
                }
                '\\' => {
                    self.advance();
                    match self.advance() {
                        Some('\n') => {}
                        Some(escaped) => word.push_literal(&escaped.to_string(), true),
                        None => word.push_literal("\\", false),
                    }
                }
                '$' => {
                    self.advance();
                    self.read_dollar(&mut word, false)?;
                }
                '`' => {
                    self.advance();
                    let script = self.read_backtick()?;
                    word.parts.push(WordPart::Substitution {
                        script,
                        quoted: false,
                    });
                }
                _ => {
                    self.advance();
                    word.push_literal(&ch.to_string(), false);
                }
            }
        }

        Ok(word)
    }

    /// Read a single-quoted string. The opening quote is consumed.
    fn read_single_quoted(&mut self) -> Result<String, LexError> {
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('\'') => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(LexError::UnterminatedQuote),
            }
        }
    }

    /// Read a double-quoted string into `word`. The opening quote is consumed.
    fn read_double_quoted(&mut self, word: &mut Word) -> Result<(), LexError> {
        // An empty "" still makes the word quoted
        word.push_literal("", true);
        loop {
            match self.advance() {
                Some('"') => return Ok(()),
                Some('\\') => match self.peek_char() {
                    Some('\n') => {
                        self.advance();
                    }
                    Some(c @ ('"' | '\\' | '$' | '`')) => {
                        self.advance();
                        word.push_literal(&c.to_string(), true);
                    }
                    _ => word.push_literal("\\", true),
                },
                Some('$') => self.read_dollar(word, true)?,
                Some('`') => {
                    let script = self.read_backtick()?;
                    word.parts.push(WordPart::Substitution {
                        script,
                        quoted: true,
                    });
                }
                Some(c) => word.push_literal(&c.to_string(), true),
                None => return Err(LexError::UnterminatedQuote),
            }
        }
    }

    /// Handle what follows a `$`. The `$` is consumed.
    fn read_dollar(&mut self, word: &mut Word, quoted: bool) -> Result<(), LexError> {
        match self.peek_char() {
            Some('(') => {
                self.advance();
                let script = self.read_group_body()?;
                word.parts.push(WordPart::Substitution { script, quoted });
            }
            Some('{') => {
                self.advance();
                let mut name = String::new();
                loop {
                    match self.advance() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(LexError::BadSubstitution(format!("${{{}", name))),
                    }
                }
                if name != "?" && !is_valid_name(&name) {
                    return Err(LexError::BadSubstitution(format!("${{{}}}", name)));
                }
                word.parts.push(WordPart::Variable { name, quoted });
            }
            Some('?') => {
                self.advance();
                word.parts.push(WordPart::Variable {
                    name: "?".to_string(),
                    quoted,
                });
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                word.parts.push(WordPart::Variable { name, quoted });
            }
            _ => word.push_literal("$", quoted),
        }
        Ok(())
    }

    /// Read the raw text of a parenthesized group up to its matching `)`.
    /// The opening `(` must already be consumed; the closing `)` is consumed
    /// but not included.
    pub fn read_group_body(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            let Some(ch) = self.advance() else {
                return Err(LexError::UnterminatedGroup);
            };
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(self.input[start..self.pos - 1].to_string());
                    }
                }
                '\\' => {
                    self.advance();
                }
                '\'' => {
                    self.read_single_quoted()
                        .map_err(|_| LexError::UnterminatedGroup)?;
                }
                '"' => self.skip_double_quoted()?,
                '`' => {
                    self.read_backtick()?;
                }
                _ => {}
            }
        }
    }

    fn skip_double_quoted(&mut self) -> Result<(), LexError> {
        loop {
            match self.advance() {
                Some('"') => return Ok(()),
                Some('\\') => {
                    self.advance();
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedGroup),
            }
        }
    }

    /// Read a backtick substitution up to the next unescaped backtick. The
    /// opening backtick is consumed.
    fn read_backtick(&mut self) -> Result<String, LexError> {
        let mut script = String::new();
        loop {
            match self.advance() {
                Some('`') => return Ok(script),
                Some('\\') => match self.advance() {
                    Some(c @ ('`' | '\\' | '$')) => script.push(c),
                    Some(c) => {
                        script.push('\\');
                        script.push(c);
                    }
                    None => return Err(LexError::UnterminatedGroup),
                },
                Some(c) => script.push(c),
                None => return Err(LexError::UnterminatedGroup),
            }
        }
    }
}
