//! `hrdesk config` – show where the config lives and what is in effect.

use anyhow::Result;
use hrdesk_core::config::{self, HrdeskConfig};

pub fn run_config(cfg: &HrdeskConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    if cfg.retry.is_none() {
        let retry = cfg.retry_options();
        println!("\n# [retry] not set; built-in defaults:");
        println!("# max_retries = {}", retry.max_retries);
        println!("# initial_delay_ms = {}", retry.initial_delay_ms);
        println!("# max_delay_ms = {}", retry.max_delay_ms);
        println!("# backoff_multiplier = {}", retry.backoff_multiplier);
    }
    Ok(())
}
