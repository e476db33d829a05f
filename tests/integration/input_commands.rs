// tests/integration/input_commands.rs

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use replit::engine::{RunScheduler, SchedulerCore, SchedulerHandle};
use replit::exec::ProcessSupervisor;
use replit::input::{parse_key, run_input_loop, InputCommand};
use replit::watch::change_channel;
use replit_test_utils::{init_tracing, with_timeout, RecordingDisplay};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn idle_handle() -> (RunScheduler, SchedulerHandle) {
    let (_notifier, changes) = change_channel();
    RunScheduler::new(
        SchedulerCore::new(Duration::from_secs(2)),
        ProcessSupervisor::new("sh", Duration::from_millis(50)),
        "/dev/null".into(),
        std::sync::Arc::new(RecordingDisplay::new()),
        changes,
        CancellationToken::new(),
    )
}

#[test]
fn single_keys_map_to_commands() {
    assert_eq!(parse_key(&key(KeyCode::Char('k'))), Some(InputCommand::Kill));
    assert_eq!(parse_key(&key(KeyCode::Char('K'))), Some(InputCommand::Kill));
    assert_eq!(parse_key(&key(KeyCode::Char('r'))), Some(InputCommand::Rerun));
    assert_eq!(parse_key(&key(KeyCode::Char('q'))), Some(InputCommand::Quit));
    assert_eq!(parse_key(&key(KeyCode::Esc)), Some(InputCommand::Quit));
    assert_eq!(parse_key(&key(KeyCode::Char('x'))), None);
    assert_eq!(parse_key(&key(KeyCode::Enter)), None);
}

#[test]
fn ctrl_c_quits_and_other_chords_are_ignored() {
    let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
    assert_eq!(parse_key(&ctrl('c')), Some(InputCommand::Quit));
    assert_eq!(parse_key(&ctrl('k')), None);
}

#[test]
fn key_releases_are_ignored() {
    let release = KeyEvent::new_with_kind(
        KeyCode::Char('k'),
        KeyModifiers::NONE,
        KeyEventKind::Release,
    );
    assert_eq!(parse_key(&release), None);
}

#[tokio::test]
async fn quit_cancels_the_session_token() {
    init_tracing();
    let (_scheduler, handle) = idle_handle();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(InputCommand::Quit).unwrap();
    tx.send(InputCommand::Kill).unwrap();
    with_timeout(run_input_loop(rx, handle, cancel.clone())).await;

    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn reader_going_away_is_not_a_quit() {
    init_tracing();
    let (_scheduler, handle) = idle_handle();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(InputCommand::Kill).unwrap();
    drop(tx);
    with_timeout(run_input_loop(rx, handle, cancel.clone())).await;

    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn rerun_key_starts_a_run() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("main.sh");
    std::fs::write(&target, "echo keyed\n").unwrap();

    let (_notifier, changes) = change_channel();
    let stop = CancellationToken::new();
    let (scheduler, handle) = RunScheduler::new(
        SchedulerCore::new(Duration::from_secs(2)),
        ProcessSupervisor::new("sh", Duration::from_millis(50)),
        target,
        std::sync::Arc::new(RecordingDisplay::new()),
        changes,
        stop.clone(),
    );
    let scheduler_task = tokio::spawn(scheduler.run());

    let (tx, rx) = mpsc::unbounded_channel();
    let quit = CancellationToken::new();
    let input = tokio::spawn(run_input_loop(rx, handle.clone(), quit.clone()));

    tx.send(InputCommand::Rerun).unwrap();
    let stats = with_timeout(handle.wait_for_count(1)).await.unwrap();
    assert_eq!(stats.count, 1);

    quit.cancel();
    with_timeout(input).await.unwrap();
    stop.cancel();
    with_timeout(scheduler_task).await.unwrap().unwrap();
}
