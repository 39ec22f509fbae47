//! Control socket: server (during `dlq run`) and client (for `dlq cancel` etc.).
//! Protocol: one line per command: "enqueue <key>", "cancel <key>" or "delete-all".

use anyhow::Result;
use dlq_core::scheduler::Scheduler;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

/// One user intent carried over the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Enqueue(String),
    Cancel(String),
    DeleteAll,
}

impl ControlCommand {
    /// Parse one protocol line. Returns `None` for malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line == "delete-all" {
            return Some(ControlCommand::DeleteAll);
        }
        let (verb, key) = line.split_once(' ')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        match verb {
            "enqueue" => Some(ControlCommand::Enqueue(key.to_string())),
            "cancel" => Some(ControlCommand::Cancel(key.to_string())),
            _ => None,
        }
    }

    pub fn to_line(&self) -> String {
        match self {
            ControlCommand::Enqueue(key) => format!("enqueue {}", key),
            ControlCommand::Cancel(key) => format!("cancel {}", key),
            ControlCommand::DeleteAll => "delete-all".to_string(),
        }
    }
}

async fn apply(scheduler: &Scheduler, command: ControlCommand) {
    match command {
        ControlCommand::Enqueue(key) => {
            if !scheduler.enqueue(key.as_str()) {
                tracing::debug!(key = %key, "control: enqueue ignored, already live");
            }
        }
        ControlCommand::Cancel(key) => {
            if !scheduler.cancel(&key).await {
                tracing::debug!(key = %key, "control: nothing to cancel");
            }
        }
        ControlCommand::DeleteAll => scheduler.delete_all().await,
    }
}

/// Spawns a task that listens on `path` and applies each command line to
/// `scheduler`. Ignores malformed lines.
pub fn spawn_control_listener(
    scheduler: Scheduler,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match ControlCommand::parse(&line) {
                                Some(command) => apply(&scheduler, command).await,
                                None => tracing::debug!("control: ignoring line {:?}", line),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends one command line to the control socket. Returns false (no-op) if
/// the socket path does not exist.
pub async fn send_command(socket_path: &Path, command: &ControlCommand) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = tokio::net::UnixStream::connect(socket_path).await?;
    let msg = format!("{}\n", command.to_line());
    stream.write_all(msg.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(true)
}
