//! Property-based tests for the tokenizer and redirection handling
//!
//! Uses proptest to generate random command lines and check that parsing
//! never panics, that redirection merging is stable, and that arbitrary
//! input never takes a session down.

use honeyshell::parser::{self, Arg, Lexer, RedirectionOp, merge_redirection_tokens, parse_redirections};
use honeyshell::{BufferTerminal, Key, Session, SessionState};
use proptest::prelude::*;
use std::sync::Arc;

mod strategies {
    use proptest::prelude::*;

    /// Arbitrary strings (mostly invalid shell)
    pub fn arbitrary_string() -> impl Strategy<Value = String> {
        prop::string::string_regex(".{0,80}").unwrap()
    }

    /// Lines rich in redirection characters
    pub fn redirection_line() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z0-9 <>&|;-]{0,40}").unwrap()
    }

    /// Plain words that can never look like an operator
    pub fn word() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9_./]{1,20}").unwrap()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Merging an already merged token stream changes nothing
    #[test]
    fn merge_is_idempotent(line in strategies::redirection_line()) {
        if let Ok(tokens) = Lexer::tokenize(&line) {
            let once = merge_redirection_tokens(tokens);
            let twice = merge_redirection_tokens(once.clone());
            prop_assert_eq!(once, twice);
        }
    }

    /// The statement parser returns a value or an error, never panics
    #[test]
    fn parse_never_panics(input in strategies::arbitrary_string()) {
        let _ = parser::parse(&input);
    }

    /// Without operators, parse_redirections leaves the arguments alone
    #[test]
    fn plain_words_are_untouched(words in prop::collection::vec(strategies::word(), 0..8)) {
        let args: Vec<Arg> = words.iter().map(Arg::word).collect();
        let (cleaned, ops) = parse_redirections(args.clone());
        prop_assert_eq!(cleaned, args);
        prop_assert!(ops.is_empty());
    }

    /// `cmd words > target` always yields one FileWrite and keeps the words
    #[test]
    fn write_redirection_is_extracted(
        words in prop::collection::vec(strategies::word(), 1..5),
        target in strategies::word(),
    ) {
        let mut args: Vec<Arg> = words.iter().map(Arg::word).collect();
        args.push(Arg::op(">"));
        args.push(Arg::word(target.clone()));
        let (cleaned, ops) = parse_redirections(args);
        prop_assert_eq!(cleaned.len(), words.len());
        prop_assert_eq!(ops, vec![RedirectionOp::FileWrite { fd: 1, path: target }]);
    }
}

// Each case needs a Tokio runtime, so keep the count low
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Arbitrary lines never panic a session, and Ctrl-C always gets back
    /// to a prompt
    #[test]
    fn session_survives_arbitrary_lines(lines in prop::collection::vec(strategies::arbitrary_string(), 1..4)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let terminal = Arc::new(BufferTerminal::new());
        let mut session = Session::builder().build(terminal.clone());
        rt.block_on(async {
            for line in &lines {
                session.line_received(line).await;
            }
            session.key_received(Key::Interrupt).await;
        });
        prop_assert!(matches!(
            session.state(),
            SessionState::Idle | SessionState::Closed
        ));
    }
}
