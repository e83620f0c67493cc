use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runner::RetryOptions;

/// Global configuration loaded from `~/.config/hrdesk/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrdeskConfig {
    /// Base URL of the HR REST backend (resources are resolved relative to it).
    pub api_base_url: String,
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a whole request.
    pub request_timeout_secs: u64,
    /// Optional bearer token sent with every request.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryOptions>,
}

impl Default for HrdeskConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            auth_token: None,
            retry: None,
        }
    }
}

impl HrdeskConfig {
    /// Retry options from the `[retry]` table, or the defaults.
    pub fn retry_options(&self) -> RetryOptions {
        self.retry.unwrap_or_default()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hrdesk")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HrdeskConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HrdeskConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<HrdeskConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: HrdeskConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    if let Some(retry) = &cfg.retry {
        retry
            .validate()
            .with_context(|| format!("invalid [retry] section in {}", path.display()))?;
    }
    Ok(cfg)
}
