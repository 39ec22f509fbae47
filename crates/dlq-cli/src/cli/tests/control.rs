//! Tests for enqueue/cancel/delete-all/config and the control line protocol.

use super::parse;
use crate::cli::control_socket::ControlCommand;
use crate::cli::CliCommand;

#[test]
fn cli_parse_enqueue() {
    match parse(&["dlq", "enqueue", "file-7"]) {
        CliCommand::Enqueue { key } => assert_eq!(key, "file-7"),
        _ => panic!("expected Enqueue"),
    }
}

#[test]
fn cli_parse_cancel() {
    match parse(&["dlq", "cancel", "file-7"]) {
        CliCommand::Cancel { key } => assert_eq!(key, "file-7"),
        _ => panic!("expected Cancel"),
    }
}

#[test]
fn cli_parse_delete_all_and_config() {
    assert!(matches!(parse(&["dlq", "delete-all"]), CliCommand::DeleteAll));
    assert!(matches!(parse(&["dlq", "config"]), CliCommand::Config));
}

#[test]
fn control_lines_roundtrip() {
    for cmd in [
        ControlCommand::Enqueue("a".into()),
        ControlCommand::Cancel("b c".into()),
        ControlCommand::DeleteAll,
    ] {
        assert_eq!(ControlCommand::parse(&cmd.to_line()), Some(cmd));
    }
}

#[test]
fn control_malformed_lines_are_ignored() {
    assert_eq!(ControlCommand::parse(""), None);
    assert_eq!(ControlCommand::parse("cancel"), None);
    assert_eq!(ControlCommand::parse("cancel   "), None);
    assert_eq!(ControlCommand::parse("pause 1"), None);
    assert_eq!(
        ControlCommand::parse("  enqueue k1 \n"),
        Some(ControlCommand::Enqueue("k1".into()))
    );
}

#[tokio::test]
async fn control_socket_applies_commands() {
    use crate::cli::control_socket::{send_command, spawn_control_listener};
    use dlq_core::scheduler::Scheduler;
    use dlq_core::work::SimulatedTransfer;
    use std::time::Duration;

    let dir = std::env::temp_dir().join(format!("dlq-test-{}", std::process::id()));
    let path = dir.join("control.sock");
    let scheduler = Scheduler::with_work(
        2,
        SimulatedTransfer::new(10, Duration::from_millis(50), Duration::from_millis(50)),
    );
    let handle = spawn_control_listener(scheduler.clone(), &path).unwrap();

    assert!(send_command(&path, &ControlCommand::Enqueue("k".into()))
        .await
        .unwrap());
    let mut watch = scheduler.observe_status("k");
    tokio::time::timeout(Duration::from_secs(2), watch.wait_for(|s| s.is_running()))
        .await
        .unwrap();

    assert!(send_command(&path, &ControlCommand::DeleteAll).await.unwrap());
    tokio::time::timeout(Duration::from_secs(2), async {
        while !scheduler.registry().is_empty() || scheduler.live_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(scheduler.gate().in_use(), 0);

    handle.abort();
    let _ = std::fs::remove_dir_all(&dir);
    assert!(!send_command(&path, &ControlCommand::DeleteAll).await.unwrap());
}
