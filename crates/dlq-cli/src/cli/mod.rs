//! CLI for the DLQ background download queue.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dlq_core::config;

use commands::{run_config, run_queue, run_send, RunOptions};
use control_socket::ControlCommand;

/// Top-level CLI for the DLQ download queue.
#[derive(Debug, Parser)]
#[command(name = "dlq")]
#[command(about = "DLQ: admission-controlled background download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue downloads and run them until every one has finished.
    Run {
        /// Task keys to download.
        keys: Vec<String>,
        /// Generate N keys (key-1 .. key-N) in addition to KEYS.
        #[arg(long, value_name = "N")]
        count: Option<usize>,
        /// Override the number of downloads allowed to run at once.
        #[arg(long, value_name = "N")]
        capacity: Option<usize>,
        /// Override the number of progress steps per download.
        #[arg(long, value_name = "N")]
        steps: Option<u32>,
    },

    /// Ask a running `dlq run` to queue another download.
    Enqueue {
        /// Task key.
        key: String,
    },

    /// Ask a running `dlq run` to cancel a download.
    Cancel {
        /// Task key.
        key: String,
    },

    /// Ask a running `dlq run` to cancel and forget every download.
    DeleteAll,

    /// Show the config file path and effective values.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                keys,
                count,
                capacity,
                steps,
            } => {
                let opts = RunOptions {
                    keys,
                    count,
                    capacity,
                    steps,
                };
                run_queue(&cfg, opts).await?;
            }
            CliCommand::Enqueue { key } => run_send(ControlCommand::Enqueue(key)).await?,
            CliCommand::Cancel { key } => run_send(ControlCommand::Cancel(key)).await?,
            CliCommand::DeleteAll => run_send(ControlCommand::DeleteAll).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
