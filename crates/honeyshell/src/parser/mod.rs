//! Parser module for Honeyshell
//!
//! Splits an input line into statements and pipeline stages. Each stage
//! keeps its raw tokens; expansion happens later, at dispatch time, so that
//! substitutions observe the effects of earlier statements on the line.

mod lexer;
mod redirect;
mod tokens;

pub use lexer::{LexError, Lexer};
pub use redirect::{Arg, RedirectionOp, merge_redirection_tokens, parse_redirections};
pub use tokens::{Token, TokenKind, Word, WordPart, is_valid_name};

/// One pipeline stage before expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum StageSource {
    /// A simple command: words and redirection operators.
    Simple(Vec<Token>),

    /// A bare `( ... )` group run in a nested context, with the
    /// redirections that followed the closing parenthesis.
    Group { script: String, redirects: Vec<Token> },
}

/// One statement: a pipeline terminated by `;`, `&&`, `||`, `&`, newline or
/// end of input. All separators are treated as sequential.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Source text of the statement, used for events and logs.
    pub text: String,
    pub stages: Vec<StageSource>,
}

/// Parse a line into statements.
pub fn parse(input: &str) -> Result<Vec<Statement>, LexError> {
    Parser::new(input).parse()
}

/// Statement splitter over the lexer's token stream.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
}

#[derive(Default)]
struct StageBuilder {
    tokens: Vec<Token>,
    group: Option<String>,
}

impl StageBuilder {
    fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.group.is_none()
    }

    fn finish(self) -> Result<StageSource, LexError> {
        let tokens = merge_redirection_tokens(self.tokens);
        match self.group {
            None => Ok(StageSource::Simple(tokens)),
            Some(script) => {
                // Only redirections may follow the closing parenthesis
                let mut expect_target = false;
                for token in &tokens {
                    match &token.kind {
                        TokenKind::Op(_) => expect_target = true,
                        TokenKind::Word(_) if expect_target => expect_target = false,
                        TokenKind::Word(word) => {
                            return Err(LexError::UnexpectedToken(
                                word.as_literal().unwrap_or_default(),
                            ));
                        }
                        TokenKind::Eof => {}
                    }
                }
                Ok(StageSource::Group {
                    script,
                    redirects: tokens,
                })
            }
        }
    }
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            lexer: Lexer::new(input),
        }
    }

    /// Parse the input into statements.
    pub fn parse(mut self) -> Result<Vec<Statement>, LexError> {
        let mut statements = Vec::new();
        let mut stages: Vec<StageSource> = Vec::new();
        let mut stage = StageBuilder::default();
        // Source range of the statement being built
        let mut range: Option<(usize, usize)> = None;
        // Set after `|`, `&&` or `||`: another command is required
        let mut need_operand = false;

        loop {
            let token = self.lexer.next_token()?;
            let op = match &token.kind {
                TokenKind::Eof => {
                    if need_operand {
                        return Err(LexError::UnexpectedEof);
                    }
                    if !stage.is_empty() {
                        stages.push(stage.finish()?);
                        statements.push(self.statement(range, stages));
                    }
                    return Ok(statements);
                }
                TokenKind::Word(_) => None,
                TokenKind::Op(op) => Some(op.clone()),
            };

            match op.as_deref() {
                Some(sep @ (";" | "\n" | "&" | "&&" | "||")) => {
                    if stage.is_empty() {
                        // Blank lines and line breaks after `|`/`&&`/`||` are fine
                        if sep == "\n" && (stages.is_empty() || need_operand) {
                            continue;
                        }
                        return Err(LexError::UnexpectedToken(display_op(sep)));
                    }
                    stages.push(std::mem::take(&mut stage).finish()?);
                    statements.push(self.statement(range.take(), std::mem::take(&mut stages)));
                    need_operand = matches!(sep, "&&" | "||");
                }
                Some("|") => {
                    if stage.is_empty() {
                        return Err(LexError::UnexpectedToken("|".to_string()));
                    }
                    stages.push(std::mem::take(&mut stage).finish()?);
                    need_operand = true;
                    extend(&mut range, &token);
                }
                Some("(") => {
                    if !stage.is_empty() {
                        return Err(LexError::UnexpectedToken("(".to_string()));
                    }
                    let script = self.lexer.read_group_body()?;
                    stage.group = Some(script);
                    need_operand = false;
                    let end = self.lexer.position();
                    range = Some(match range {
                        Some((start, _)) => (start, end),
                        None => (token.span.start, end),
                    });
                }
                Some(other @ (")" | ";;")) => {
                    return Err(LexError::UnexpectedToken(other.to_string()));
                }
                _ => {
                    need_operand = false;
                    extend(&mut range, &token);
                    stage.tokens.push(token);
                }
            }
        }
    }

    fn statement(&self, range: Option<(usize, usize)>, stages: Vec<StageSource>) -> Statement {
        let text = range
            .and_then(|(start, end)| self.input.get(start..end))
            .unwrap_or_default()
            .trim()
            .to_string();
        Statement { text, stages }
    }
}

fn extend(range: &mut Option<(usize, usize)>, token: &Token) {
    *range = Some(match *range {
        Some((start, _)) => (start, token.span.end),
        None => (token.span.start, token.span.end),
    });
}

fn display_op(op: &str) -> String {
    if op == "\n" {
        "newline".to_string()
    } else {
        op.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(stage: &StageSource) -> Vec<String> {
        match stage {
            StageSource::Simple(tokens) => tokens
                .iter()
                .map(|t| match &t.kind {
                    TokenKind::Word(w) => w.as_literal().unwrap_or_default(),
                    TokenKind::Op(op) => op.clone(),
                    TokenKind::Eof => String::new(),
                })
                .collect(),
            StageSource::Group { script, .. } => vec![format!("({})", script)],
        }
    }

    #[test]
    fn test_statement_separators() {
        let statements = parse("echo a; echo b && echo c || echo d & echo e\necho f").unwrap();
        let texts: Vec<_> = statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["echo a", "echo b", "echo c", "echo d", "echo e", "echo f"]
        );
    }

    #[test]
    fn test_pipeline_stages() {
        let statements = parse("cat /etc/passwd | grep root | wc -l").unwrap();
        assert_eq!(statements.len(), 1);
        let stages: Vec<_> = statements[0].stages.iter().map(words).collect();
        assert_eq!(
            stages,
            vec![
                vec!["cat", "/etc/passwd"],
                vec!["grep", "root"],
                vec!["wc", "-l"]
            ]
        );
        assert_eq!(statements[0].text, "cat /etc/passwd | grep root | wc -l");
    }

    #[test]
    fn test_redirections_merged_per_stage() {
        let statements = parse("ls 2>&1 | cat").unwrap();
        assert_eq!(words(&statements[0].stages[0]), vec!["ls", "2>&1"]);
    }

    #[test]
    fn test_group_stage() {
        let statements = parse("(echo a; echo b) > out | cat").unwrap();
        let StageSource::Group { script, redirects } = &statements[0].stages[0] else {
            panic!("expected group");
        };
        assert_eq!(script, "echo a; echo b");
        assert_eq!(redirects.len(), 2);
        assert_eq!(statements[0].text, "(echo a; echo b) > out | cat");
    }

    #[test]
    fn test_group_after_pipe() {
        let statements = parse("echo x | (cat)").unwrap();
        assert!(matches!(
            statements[0].stages[1],
            StageSource::Group { .. }
        ));
    }

    #[test]
    fn test_misplaced_group_is_error() {
        assert_eq!(
            parse("cmd (echo x)").unwrap_err(),
            LexError::UnexpectedToken("(".to_string())
        );
        assert_eq!(
            parse("(echo x) y").unwrap_err(),
            LexError::UnexpectedToken("y".to_string())
        );
        assert_eq!(
            parse("echo x)").unwrap_err(),
            LexError::UnexpectedToken(")".to_string())
        );
    }

    #[test]
    fn test_empty_operands() {
        assert_eq!(
            parse("; echo a").unwrap_err(),
            LexError::UnexpectedToken(";".to_string())
        );
        assert_eq!(
            parse("echo a && && echo b").unwrap_err(),
            LexError::UnexpectedToken("&&".to_string())
        );
        assert_eq!(
            parse("| grep x").unwrap_err(),
            LexError::UnexpectedToken("|".to_string())
        );
        assert_eq!(
            parse("echo a;;").unwrap_err(),
            LexError::UnexpectedToken(";;".to_string())
        );
        assert_eq!(parse("echo a |").unwrap_err(), LexError::UnexpectedEof);
        assert_eq!(parse("echo a &&").unwrap_err(), LexError::UnexpectedEof);
    }

    #[test]
    fn test_trailing_separators_and_blank_lines() {
        assert_eq!(parse("echo a;").unwrap().len(), 1);
        assert_eq!(parse("echo a &").unwrap().len(), 1);
        assert_eq!(parse("\n\necho a\n\n").unwrap().len(), 1);
        assert_eq!(parse("echo a |\ngrep a").unwrap()[0].stages.len(), 2);
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   # just a comment").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_group() {
        assert_eq!(parse("(echo a").unwrap_err(), LexError::UnterminatedGroup);
        assert!(parse("(echo a").unwrap_err().is_incomplete());
    }
}
