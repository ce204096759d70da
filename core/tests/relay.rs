#![cfg(unix)]

mod common;

use std::io::Cursor;
use std::path::Path;

use pretty_assertions::assert_eq;
use tapline_core::api::{run_command, RunCommandArgs, RunnerError, RunnerResult};

use common::{lines, parse_transcript, payloads, test_config, SharedBuf};

struct Relay {
    result: RunnerResult,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    transcript: Vec<(char, Vec<u8>)>,
}

async fn relay(command: &str, input: &[u8]) -> Relay {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.log");
    let cfg = test_config();
    let out = SharedBuf::default();
    let err = SharedBuf::default();

    let result = run_command(RunCommandArgs {
        command,
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(Cursor::new(input.to_vec())),
        output: Box::new(out.clone()),
        error: Box::new(err.clone()),
    })
    .await
    .expect("run failed");

    let raw = std::fs::read(&log_path).unwrap();
    Relay {
        result,
        stdout: out.contents(),
        stderr: err.contents(),
        transcript: parse_transcript(&raw),
    }
}

#[tokio::test]
async fn cat_echoes_input_and_logs_both_directions() {
    let r = relay("cat", b"hello\nworld\n").await;

    assert_eq!(r.stdout, b"hello\nworld\n");
    assert!(r.stderr.is_empty());
    assert_eq!(payloads(&r.transcript, '>'), lines(&["hello", "world"]));
    assert_eq!(payloads(&r.transcript, '<'), lines(&["hello", "world"]));
    assert_eq!(r.transcript.len(), 4);
    assert_eq!(r.transcript[0], ('>', b"hello".to_vec()));
    assert_eq!(r.result.transcript_entries, 4);
    assert_eq!(r.result.stdin.lines, 2);
    assert_eq!(r.result.stdout.lines, 2);
    assert!(!r.result.input_abandoned);
}

#[tokio::test]
async fn stderr_only_command_logs_single_error_entry() {
    let r = relay("echo err >&2", b"").await;

    assert_eq!(r.transcript, vec![('E', b"err".to_vec())]);
    assert_eq!(r.stderr, b"err\n");
    assert!(r.stdout.is_empty());
    assert_eq!(r.result.stdin.lines, 0);
}

#[tokio::test]
async fn same_source_entries_keep_their_order() {
    let r = relay(
        "for i in 1 2 3 4 5; do echo out$i; echo err$i >&2; done",
        b"",
    )
    .await;

    assert_eq!(
        payloads(&r.transcript, '<'),
        lines(&["out1", "out2", "out3", "out4", "out5"])
    );
    assert_eq!(
        payloads(&r.transcript, 'E'),
        lines(&["err1", "err2", "err3", "err4", "err5"])
    );
    assert_eq!(r.stdout, b"out1\nout2\nout3\nout4\nout5\n");
}

#[tokio::test]
async fn payloads_reconstruct_each_stream() {
    let input: String = (0..500).map(|i| format!("line {i}\n")).collect();
    let r = relay("cat; echo done >&2", input.as_bytes()).await;

    let rebuilt: Vec<u8> = payloads(&r.transcript, '>')
        .into_iter()
        .flat_map(|mut p| {
            p.push(b'\n');
            p
        })
        .collect();
    assert_eq!(rebuilt, input.as_bytes());
    assert_eq!(r.stdout, input.as_bytes());
    assert_eq!(payloads(&r.transcript, 'E'), lines(&["done"]));
    assert_eq!(r.result.stdin.lines, 500);
    assert_eq!(r.result.transcript_entries, 1001);
}

#[tokio::test]
async fn non_utf8_output_is_relayed_verbatim() {
    let r = relay(r"printf '\377\376ok\n'", b"").await;

    assert_eq!(r.stdout, b"\xff\xfeok\n");
    assert_eq!(payloads(&r.transcript, '<'), vec![b"\xff\xfeok".to_vec()]);
}

#[tokio::test]
async fn trailing_segment_without_newline_is_a_line() {
    let r = relay("printf 'a\\ntail'", b"").await;

    assert_eq!(r.stdout, b"a\ntail\n");
    assert_eq!(payloads(&r.transcript, '<'), lines(&["a", "tail"]));
}

#[tokio::test]
async fn shell_features_work_in_command_string() {
    let r = relay("tr a-z A-Z | sed 's/^/> /'", b"abc\n").await;

    assert_eq!(r.stdout, b"> ABC\n");
    assert_eq!(payloads(&r.transcript, '>'), lines(&["abc"]));
    assert_eq!(payloads(&r.transcript, '<'), lines(&["> ABC"]));
}

#[tokio::test]
async fn child_exit_code_is_reported() {
    let r = relay("echo bye; exit 7", b"").await;
    assert_eq!(r.result.exit_code, 7);
    assert_eq!(payloads(&r.transcript, '<'), lines(&["bye"]));
}

#[tokio::test]
async fn log_file_is_truncated_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.log");
    std::fs::write(&log_path, "stale contents\n").unwrap();
    let cfg = test_config();

    run_command(RunCommandArgs {
        command: "echo fresh",
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(Cursor::new(Vec::new())),
        output: Box::new(SharedBuf::default()),
        error: Box::new(SharedBuf::default()),
    })
    .await
    .unwrap();

    let entries = parse_transcript(&std::fs::read(&log_path).unwrap());
    assert_eq!(entries, vec![('<', b"fresh".to_vec())]);
}

#[tokio::test]
async fn unwritable_log_path_fails_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("missing").join("session.log");
    let marker = dir.path().join("spawned");
    let command = format!("touch {}", marker.display());
    let cfg = test_config();

    let err = run_command(RunCommandArgs {
        command: &command,
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(Cursor::new(Vec::new())),
        output: Box::new(SharedBuf::default()),
        error: Box::new(SharedBuf::default()),
    })
    .await
    .unwrap_err();

    assert!(matches!(err, RunnerError::LogFile { .. }));
    assert!(!Path::new(&marker).exists());
}

#[tokio::test]
async fn bad_timestamp_format_fails_before_any_side_effect() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.log");
    let marker = dir.path().join("spawned");
    let command = format!("touch {}", marker.display());
    let mut cfg = test_config();
    cfg.transcript.timestamp_format = "%Q".to_string();

    let err = run_command(RunCommandArgs {
        command: &command,
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(Cursor::new(Vec::new())),
        output: Box::new(SharedBuf::default()),
        error: Box::new(SharedBuf::default()),
    })
    .await
    .unwrap_err();

    assert!(matches!(err, RunnerError::Config(_)));
    assert!(!log_path.exists());
    // Give a wrongly spawned child time to show up.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn missing_shell_is_a_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.log");
    let mut cfg = test_config();
    cfg.runner.shell = "/nonexistent/tapline-shell".to_string();

    let err = run_command(RunCommandArgs {
        command: "true",
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(Cursor::new(Vec::new())),
        output: Box::new(SharedBuf::default()),
        error: Box::new(SharedBuf::default()),
    })
    .await
    .unwrap_err();

    assert!(matches!(err, RunnerError::Spawn(_)));
    // Created before the spawn attempt, nothing recorded.
    assert_eq!(std::fs::read(&log_path).unwrap(), b"");
}

#[tokio::test]
async fn pending_input_is_dropped_once_child_is_gone() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.log");
    let cfg = test_config();
    let out = SharedBuf::default();

    // Keep the writer half alive so our "stdin" never reaches EOF.
    let (_keep_open, input) = tokio::io::duplex(64);

    let result = run_command(RunCommandArgs {
        command: "echo done",
        log_path: &log_path,
        cfg: &cfg,
        input: Box::new(input),
        output: Box::new(out.clone()),
        error: Box::new(SharedBuf::default()),
    })
    .await
    .unwrap();

    assert!(result.input_abandoned);
    assert_eq!(result.exit_code, 0);
    assert_eq!(out.contents(), b"done\n");
    let entries = parse_transcript(&std::fs::read(&log_path).unwrap());
    assert_eq!(entries, vec![('<', b"done".to_vec())]);
}
