use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Global configuration loaded from `~/.config/dlq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqConfig {
    /// Admission gate capacity: maximum task bodies running at once.
    pub max_concurrent_tasks: usize,
    /// Progress steps per simulated transfer.
    #[serde(default = "default_step_count")]
    pub step_count: u32,
    /// Lower bound of the per-task step delay in milliseconds.
    #[serde(default = "default_step_delay_min_ms")]
    pub step_delay_min_ms: u64,
    /// Upper bound of the per-task step delay in milliseconds.
    #[serde(default = "default_step_delay_max_ms")]
    pub step_delay_max_ms: u64,
}

fn default_step_count() -> u32 {
    10
}

fn default_step_delay_min_ms() -> u64 {
    100
}

fn default_step_delay_max_ms() -> u64 {
    200
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            step_count: default_step_count(),
            step_delay_min_ms: default_step_delay_min_ms(),
            step_delay_max_ms: default_step_delay_max_ms(),
        }
    }
}

impl DlqConfig {
    /// Clamp values into a usable range (capacity and steps at least 1, min <= max delay).
    pub fn normalized(mut self) -> Self {
        self.max_concurrent_tasks = self.max_concurrent_tasks.max(1);
        self.step_count = self.step_count.max(1);
        if self.step_delay_min_ms > self.step_delay_max_ms {
            std::mem::swap(&mut self.step_delay_min_ms, &mut self.step_delay_max_ms);
        }
        self
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlqConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<DlqConfig> {
    if !path.exists() {
        let default_cfg = DlqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: DlqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg.normalized())
}
