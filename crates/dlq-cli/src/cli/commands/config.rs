//! `dlq config` – show where the config lives and what is in effect.

use anyhow::Result;
use dlq_core::config::{self, DlqConfig};

pub fn run_config(cfg: &DlqConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("config: {}", path.display());
    println!("max_concurrent_tasks = {}", cfg.max_concurrent_tasks);
    println!("step_count = {}", cfg.step_count);
    println!(
        "step_delay_ms = {}..={}",
        cfg.step_delay_min_ms, cfg.step_delay_max_ms
    );
    Ok(())
}
