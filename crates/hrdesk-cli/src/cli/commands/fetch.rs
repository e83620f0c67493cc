//! `hrdesk fetch` – GET a backend resource with classified retries.

use anyhow::{bail, Result};
use hrdesk_core::api::{ApiClient, Resource};
use hrdesk_core::config::HrdeskConfig;
use hrdesk_core::runner::{RetryOptions, RunOptions, RunOutcome, Runner};

pub async fn run_fetch(
    cfg: &HrdeskConfig,
    resource: Resource,
    id: Option<&str>,
    retry: RetryOptions,
) -> Result<()> {
    let client = ApiClient::from_config(cfg)?;
    let runner = Runner::new();
    let options = RunOptions::new(retry).on_retry_scheduled(|attempt, delay, err| {
        eprintln!(
            "attempt {} failed ({}): {}; retrying in {} ms",
            attempt,
            err.kind,
            err.message,
            delay.as_millis()
        );
    });

    match client.fetch_with_retry(&runner, resource, id, options).await? {
        RunOutcome::Succeeded(resp) => {
            match resp.json::<serde_json::Value>() {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{}", resp.text()),
            }
            Ok(())
        }
        RunOutcome::Failed(err) => bail!("{} {}: {}", err.error.kind, resource, err),
        RunOutcome::Cancelled => bail!("request cancelled"),
    }
}
