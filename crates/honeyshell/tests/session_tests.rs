//! Integration tests for emulated sessions
//!
//! Drives [`Session`] through the public API the way a transport would:
//! whole lines for line-mode clients, raw bytes for character-mode ones.

use honeyshell::{
    BufferTerminal, Config, Event, InMemoryFs, Limits, MemoryEventSink, Session, SessionState,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const PROMPT: &str = "root@svr04:~# ";

struct Client {
    session: Session,
    terminal: Arc<BufferTerminal>,
    events: Arc<MemoryEventSink>,
}

impl Client {
    fn new() -> Self {
        Self::with(Config::default(), InMemoryFs::new())
    }

    fn with(config: Config, fs: InMemoryFs) -> Self {
        let terminal = Arc::new(BufferTerminal::new());
        let events = Arc::new(MemoryEventSink::new());
        let session = Session::builder()
            .config(config)
            .fs(Arc::new(fs))
            .event_sink(events.clone())
            .build(terminal.clone());
        Self {
            session,
            terminal,
            events,
        }
    }

    /// Send a line and return everything the client saw.
    async fn line(&mut self, line: &str) -> String {
        self.session.line_received(line).await;
        self.terminal.take_output()
    }

    /// Send raw bytes and return everything the client saw.
    async fn keys(&mut self, data: &str) -> String {
        self.session.data_received(data.as_bytes()).await;
        self.terminal.take_output()
    }

    fn event_ids(&self) -> Vec<&'static str> {
        self.events.events().iter().map(Event::event_id).collect()
    }
}

#[tokio::test]
async fn test_prompt_and_simple_command() {
    let mut client = Client::new();
    client.session.show_prompt();
    assert_eq!(client.terminal.take_output(), PROMPT);
    assert_eq!(client.line("echo hello").await, format!("hello\n{}", PROMPT));
}

#[tokio::test]
async fn test_nested_substitution() {
    let mut client = Client::new();
    assert_eq!(
        client.line("echo $(echo $(echo inner))").await,
        format!("inner\n{}", PROMPT)
    );
    assert_eq!(
        client.line("echo \"[$(echo a b)]\" $(echo c d)").await,
        format!("[a b] c d\n{}", PROMPT)
    );
}

#[tokio::test]
async fn test_not_found_does_not_stop_queue() {
    let mut client = Client::new();
    assert_eq!(
        client.line("wget http://x/y; echo after").await,
        format!("-bash: wget: command not found\nafter\n{}", PROMPT)
    );
    assert_eq!(
        client.event_ids(),
        [
            "honeyshell.command.input",
            "honeyshell.command.failed",
            "honeyshell.command.input",
        ]
    );
}

#[tokio::test]
async fn test_uname_and_identity() {
    let config = Config {
        hostname: "web01".to_string(),
        ..Config::default()
    };
    let mut client = Client::with(config, InMemoryFs::new());
    assert_eq!(
        client.line("whoami; hostname; uname -n").await,
        "root\nweb01\nweb01\nroot@web01:~# "
    );
}

#[tokio::test]
async fn test_redirect_then_read_back() {
    let mut client = Client::new();
    client.line("echo one > /tmp/f; echo two >> /tmp/f").await;
    assert_eq!(client.line("cat /tmp/f").await, format!("one\ntwo\n{}", PROMPT));

    let redirects: Vec<_> = client
        .events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::FileRedirect {
                output_path, size, ..
            } => Some((output_path, size)),
            _ => None,
        })
        .collect();
    assert_eq!(
        redirects,
        [("/tmp/f".to_string(), 4), ("/tmp/f".to_string(), 4)]
    );
}

#[tokio::test]
async fn test_quota_stops_writes() {
    let config = Config {
        limits: Limits::new().max_file_size(8),
        ..Config::default()
    };
    let mut client = Client::with(config, InMemoryFs::new());
    assert_eq!(
        client.line("echo 0123456789 > /tmp/big; echo next").await,
        format!("-bash: /tmp/big: File too large\nnext\n{}", PROMPT)
    );
    assert_eq!(client.line("cat /tmp/big").await, PROMPT);
}

#[tokio::test]
async fn test_multiline_quote() {
    let mut client = Client::new();
    assert_eq!(client.line("echo 'first").await, "> ");
    assert_eq!(client.session.state(), SessionState::AwaitingStatement);
    assert_eq!(client.line("second'").await, format!("first\nsecond\n{}", PROMPT));
    assert_eq!(client.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_syntax_error_discards_line() {
    let mut client = Client::new();
    assert_eq!(
        client.line("echo a; echo (b)").await,
        format!("-bash: syntax error near unexpected token `('\n{}", PROMPT)
    );
}

#[tokio::test]
async fn test_export_persists_across_lines() {
    let mut client = Client::new();
    client.line("export GREETING=hi").await;
    assert_eq!(client.session.env_var("GREETING"), Some("hi"));
    assert_eq!(client.line("echo $GREETING").await, format!("hi\n{}", PROMPT));
}

#[tokio::test]
async fn test_cd_changes_prompt() {
    let mut client = Client::new();
    assert_eq!(client.line("cd /tmp").await, "root@svr04:/tmp# ");
    assert_eq!(client.session.cwd(), std::path::Path::new("/tmp"));
    assert_eq!(client.line("cd").await, PROMPT);
}

#[tokio::test]
async fn test_nested_shell_and_exit() {
    let mut client = Client::new();
    assert_eq!(client.line("sh").await, PROMPT);
    assert_eq!(client.session.depth(), 1);

    client.line("cd /tmp; export INNER=1").await;
    assert_eq!(client.session.cwd(), std::path::Path::new("/tmp"));

    assert_eq!(client.line("exit").await, PROMPT);
    assert_eq!(client.session.depth(), 0);
    assert_eq!(client.session.cwd(), std::path::Path::new("/root"));
    assert_eq!(client.session.env_var("INNER"), None);
    assert!(!client.terminal.is_closed());
}

#[tokio::test]
async fn test_statements_after_nested_shell_resume() {
    let mut client = Client::new();
    assert_eq!(client.line("sh; echo back").await, PROMPT);
    assert_eq!(client.line("exit").await, format!("back\n{}", PROMPT));
}

#[tokio::test]
async fn test_nesting_limit() {
    let config = Config {
        limits: Limits::new().max_nesting_depth(1),
        ..Config::default()
    };
    let mut client = Client::with(config, InMemoryFs::new());
    client.line("bash").await;
    assert_eq!(client.session.depth(), 1);
    assert_eq!(
        client.line("bash").await,
        format!("-bash: maximum nesting level exceeded (1)\n{}", PROMPT)
    );
    assert_eq!(client.session.depth(), 1);
}

#[tokio::test]
async fn test_exit_closes_session() {
    let mut client = Client::new();
    assert_eq!(client.line("exit; echo never").await, "");
    assert_eq!(client.session.state(), SessionState::Closed);
    assert!(client.terminal.is_closed());
    assert_eq!(client.event_ids().last(), Some(&"honeyshell.session.closed"));

    // Input after close is ignored
    assert_eq!(client.line("echo late").await, "");
}

#[tokio::test]
async fn test_command_awaiting_input() {
    let mut client = Client::new();
    assert_eq!(client.line("cat").await, "");
    assert_eq!(client.session.state(), SessionState::Dispatching);
    assert_eq!(client.line("echo not run").await, "echo not run\n");
    assert_eq!(client.keys("\x04").await, PROMPT);
    assert_eq!(client.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_typed_keys_are_echoed() {
    let mut client = Client::new();
    assert_eq!(client.keys("ecoh").await, "ecoh");
    assert_eq!(client.keys("\x7f\x7f").await, "\x08 \x1b[1D\x08 \x1b[1D");
    assert_eq!(client.keys("ho x\r").await, format!("ho x\r\nx\n{}", PROMPT));
    assert_eq!(client.session.history(), ["echo x"]);
}

#[tokio::test]
async fn test_history_recall() {
    let mut client = Client::new();
    client.keys("echo one\r").await;
    assert_eq!(client.keys("\x1b[A").await, "\x1b[Kecho one");
    assert_eq!(client.keys("\r").await, format!("\r\none\n{}", PROMPT));
}

#[tokio::test]
async fn test_ctrl_c_cancels_waiting_command() {
    let mut client = Client::new();
    client.keys("grep x\r").await;
    assert_eq!(client.session.state(), SessionState::Dispatching);
    assert_eq!(client.keys("\x03").await, format!("^C\r\n{}", PROMPT));
    assert_eq!(client.session.state(), SessionState::Idle);
    assert_eq!(client.keys("echo ok\r").await, format!("echo ok\r\nok\n{}", PROMPT));
}

#[tokio::test]
async fn test_ctrl_c_drops_partial_line() {
    let mut client = Client::new();
    client.keys("echo 'open\r").await;
    assert_eq!(client.session.state(), SessionState::AwaitingStatement);
    assert_eq!(client.keys("\x03").await, format!("^C\r\n{}", PROMPT));
    assert_eq!(client.keys("echo ok\r").await, format!("echo ok\r\nok\n{}", PROMPT));
}

#[tokio::test]
async fn test_ctrl_d_on_empty_line_exits() {
    let mut client = Client::new();
    client.keys("sh\r").await;
    assert_eq!(client.session.depth(), 1);
    assert_eq!(client.keys("\x04").await, format!("exit\r\n{}", PROMPT));
    assert_eq!(client.session.depth(), 0);

    // Not on a non-empty line
    client.keys("ec").await;
    assert_eq!(client.keys("\x04").await, "");
    assert_eq!(client.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_tab_completion() {
    let fs = InMemoryFs::new()
        .with_file("/etc/passwd", "root:x:0:0::/root:/bin/bash\n")
        .with_file("/etc/passwd-", "")
        .with_file("/etc/profile", "");
    let mut client = Client::with(Config::default(), fs);

    assert_eq!(client.keys("cat /etc/pas\t").await, "cat /etc/passwd");
    assert_eq!(
        client.keys("\t").await,
        format!("\r\npasswd   passwd-\r\n{}cat /etc/passwd", PROMPT)
    );
    assert_eq!(client.keys("\x15").await, "\x1b[15D\x1b[K");
    assert_eq!(client.keys("cat /etc/pro\t").await, "cat /etc/profile ");
}

#[tokio::test]
async fn test_ctrl_l_redraws() {
    let mut client = Client::new();
    client.keys("ls").await;
    assert_eq!(client.keys("\x0c").await, format!("\x1b[H\x1b[2J{}ls", PROMPT));
}

#[tokio::test]
async fn test_non_interactive_session_closes_when_done() {
    let terminal = Arc::new(BufferTerminal::new());
    let mut session = Session::builder()
        .interactive(false)
        .build(terminal.clone());
    session.line_received("echo a | cat; cat").await;
    assert_eq!(terminal.output(), "a\n");
    assert_eq!(session.state(), SessionState::Closed);
    assert!(terminal.is_closed());
}

#[tokio::test]
async fn test_text_command_and_custom_env() {
    let terminal = Arc::new(BufferTerminal::new());
    let mut session = Session::builder()
        .text_command("/usr/bin/lscpu", "Architecture: x86_64\n")
        .env("LANG", "C")
        .build(terminal.clone());
    session.line_received("lscpu; echo $LANG").await;
    assert_eq!(
        terminal.take_output(),
        format!("Architecture: x86_64\nC\n{}", PROMPT)
    );
}

#[tokio::test(start_paused = true)]
async fn test_ctrl_c_interrupts_sleep() {
    let mut client = Client::new();
    assert_eq!(client.line("sleep 30; echo never").await, "");
    assert_eq!(client.session.state(), SessionState::Dispatching);
    assert!(client.session.deadline().is_some());

    assert_eq!(client.keys("\x03").await, format!("^C\r\n{}", PROMPT));
    assert_eq!(client.session.state(), SessionState::Idle);
    assert_eq!(client.session.deadline(), None);
    assert_eq!(client.line("echo ok").await, format!("ok\n{}", PROMPT));
}

#[tokio::test(start_paused = true)]
async fn test_sleep_ends_at_deadline_then_runs_type_ahead() {
    let mut client = Client::new();
    assert_eq!(client.line("sleep 5; echo done").await, "");
    assert_eq!(client.line("echo typed").await, "");
    // Ctrl-D does not end a sleep
    assert_eq!(client.keys("\x04").await, "");

    client.session.timer_expired().await;
    assert_eq!(client.terminal.take_output(), "");
    assert_eq!(client.session.state(), SessionState::Dispatching);

    tokio::time::advance(Duration::from_secs(5)).await;
    client.session.timer_expired().await;
    assert_eq!(
        client.terminal.take_output(),
        format!("done\ntyped\n{}", PROMPT)
    );
    assert_eq!(client.session.state(), SessionState::Idle);
    assert_eq!(client.session.history(), ["sleep 5; echo done", "echo typed"]);
}

#[tokio::test]
async fn test_tilde_path_is_globbed() {
    let fs = InMemoryFs::new()
        .with_file("/root/a.txt", "")
        .with_file("/root/b.txt", "");
    let mut client = Client::with(Config::default(), fs);
    assert_eq!(
        client.line("echo ~/*.txt").await,
        format!("/root/a.txt /root/b.txt\n{}", PROMPT)
    );
}

#[tokio::test]
async fn test_piped_input_reaches_groups_and_scripts() {
    let fs = InMemoryFs::new().with_file("/tmp/in", "from file\n");
    let mut client = Client::with(Config::default(), fs);
    assert_eq!(client.line("echo x | (cat)").await, format!("x\n{}", PROMPT));
    assert_eq!(client.line("(cat) < /tmp/in").await, format!("from file\n{}", PROMPT));
    assert_eq!(client.line("echo x | sh -c cat").await, format!("x\n{}", PROMPT));
    assert_eq!(client.line("A=1 sh -c 'echo $A'").await, format!("1\n{}", PROMPT));
}
