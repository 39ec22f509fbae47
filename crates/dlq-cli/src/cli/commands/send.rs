//! `dlq enqueue|cancel|delete-all` – forward an intent to a running `dlq run`.

use anyhow::Result;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_send(command: ControlCommand) -> Result<()> {
    let socket_path = dlq_core::control::default_control_socket_path()?;
    if control_socket::send_command(&socket_path, &command).await? {
        println!("sent: {}", command.to_line());
    } else {
        println!("No running queue (dlq run) to send to.");
    }
    Ok(())
}
