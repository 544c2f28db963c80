//! Integration tests for redirections and the file events they produce

use honeyshell::{BufferTerminal, Config, Event, InMemoryFs, MemoryEventSink, Session};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

/// sha256("hello\n")
const HELLO_SHA: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

async fn run(config: Config, line: &str) -> (Arc<InMemoryFs>, Vec<Event>, String) {
    let fs = Arc::new(InMemoryFs::new());
    let events = Arc::new(MemoryEventSink::new());
    let terminal = Arc::new(BufferTerminal::new());
    let mut session = Session::builder()
        .config(config)
        .fs(fs.clone())
        .event_sink(events.clone())
        .interactive(false)
        .build(terminal.clone());
    session.line_received(line).await;
    (fs, events.events(), terminal.output())
}

fn redirects(events: &[Event]) -> Vec<&Event> {
    events
        .iter()
        .filter(|e| matches!(e, Event::FileRedirect { .. }))
        .collect()
}

async fn read(fs: &InMemoryFs, path: &str) -> String {
    use honeyshell::FileSystem;
    String::from_utf8(fs.read_file(Path::new(path)).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_file_redirect_event() {
    let config = Config {
        session_id: "s1".to_string(),
        ..Config::default()
    };
    let (fs, events, output) = run(config, "echo hello > /tmp/out").await;
    assert_eq!(output, "");
    assert_eq!(read(&fs, "/tmp/out").await, "hello\n");
    assert_eq!(
        redirects(&events),
        [&Event::FileRedirect {
            session: "s1".to_string(),
            input: "echo hello > /tmp/out".to_string(),
            output_path: "/tmp/out".to_string(),
            source_path: String::new(),
            shasum: HELLO_SHA.to_string(),
            size: 6,
        }]
    );
}

#[tokio::test]
async fn test_relative_target_resolves_against_cwd() {
    let (fs, events, _) = run(Config::default(), "cd /tmp; echo hello > rel").await;
    assert_eq!(read(&fs, "/tmp/rel").await, "hello\n");
    assert!(matches!(
        redirects(&events).as_slice(),
        [Event::FileRedirect { output_path, .. }] if output_path == "/tmp/rel"
    ));
}

#[tokio::test]
async fn test_staging_copy_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        session_id: "abc".to_string(),
        download_path: Some(dir.path().to_path_buf()),
        ..Config::default()
    };
    let (_, events, _) = run(config, "echo hello > /tmp/x.sh").await;

    let redirected = redirects(&events);
    let [Event::FileRedirect { source_path, shasum, .. }] = redirected.as_slice() else {
        panic!("expected one redirect event, got {:?}", events);
    };
    assert_eq!(shasum, HELLO_SHA);
    let staged = Path::new(source_path);
    assert!(staged.starts_with(dir.path()));
    let name = staged.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("abc-"), "{}", name);
    assert!(name.ends_with("-_tmp_x.sh"), "{}", name);
    assert_eq!(std::fs::read_to_string(staged).unwrap(), "hello\n");
}

#[tokio::test]
async fn test_stderr_to_file_and_dup() {
    let (fs, _, output) = run(
        Config::default(),
        "cat /nope 2> /tmp/err; cat /nope > /tmp/both 2>&1",
    )
    .await;
    assert_eq!(output, "");
    assert_eq!(read(&fs, "/tmp/err").await, "cat: /nope: No such file or directory\n");
    assert_eq!(read(&fs, "/tmp/both").await, "cat: /nope: No such file or directory\n");
}

#[tokio::test]
async fn test_dev_null_emits_no_event() {
    let (_, events, output) = run(Config::default(), "echo quiet > /dev/null").await;
    assert_eq!(output, "");
    assert!(redirects(&events).is_empty());
}

#[tokio::test]
async fn test_bad_descriptor() {
    let (_, _, output) = run(Config::default(), "echo x 1>&7").await;
    assert_eq!(output, "-bash: 7: Bad file descriptor\nx\n");
}

#[tokio::test]
async fn test_pipeline_stage_redirect() {
    let (fs, events, output) = run(
        Config::default(),
        "echo alpha | grep alpha > /tmp/g | cat",
    )
    .await;
    assert_eq!(output, "");
    assert_eq!(read(&fs, "/tmp/g").await, "alpha\n");
    assert_eq!(redirects(&events).len(), 1);
}
