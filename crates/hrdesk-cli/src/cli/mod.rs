//! CLI for the hrdesk client core.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use hrdesk_core::api::Resource;
use hrdesk_core::config;
use hrdesk_core::runner::RetryOptions;

use commands::{run_classify, run_config, run_fetch, run_simulate, run_statuses};

/// Top-level CLI for hrdesk.
#[derive(Debug, Parser)]
#[command(name = "hrdesk")]
#[command(about = "hrdesk: HR backend client with classified retries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for the configured retry policy.
#[derive(Debug, Clone, Default, Args)]
pub struct RetryArgs {
    /// Retries allowed after the first attempt.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,
    /// Delay before the first retry, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub initial_delay_ms: Option<u64>,
    /// Upper bound on a single delay, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub max_delay_ms: Option<u64>,
    /// Backoff growth factor (> 1).
    #[arg(long, value_name = "X")]
    pub multiplier: Option<f64>,
}

impl RetryArgs {
    pub fn apply(&self, mut base: RetryOptions) -> RetryOptions {
        if let Some(n) = self.max_retries {
            base.max_retries = n;
        }
        if let Some(ms) = self.initial_delay_ms {
            base.initial_delay_ms = ms;
        }
        if let Some(ms) = self.max_delay_ms {
            base.max_delay_ms = ms;
        }
        if let Some(x) = self.multiplier {
            base.backoff_multiplier = x;
        }
        base
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Classify a failure description and show kind, retryability and message.
    Classify {
        /// HTTP status of the failed response.
        #[arg(long)]
        status: Option<u16>,
        /// Server-provided error message.
        #[arg(long)]
        message: Option<String>,
        /// Server-provided error code.
        #[arg(long)]
        code: Option<String>,
        /// No response reached the client at all.
        #[arg(long)]
        no_response: bool,
        /// The request timed out.
        #[arg(long)]
        timeout: bool,
        /// Print the classification as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the HTTP statuses with an explicit classification.
    Statuses,

    /// GET a backend resource, retrying transient failures.
    Fetch {
        /// employees, leave-requests, onboarding or users.
        resource: Resource,
        /// Fetch a single record instead of the collection.
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Run a synthetic operation that fails K times, to preview the retry schedule.
    Simulate {
        /// Status each failing attempt returns.
        #[arg(long, default_value = "503", value_name = "STATUS")]
        fail_status: u16,
        /// Number of failing attempts before success.
        #[arg(long, default_value = "2", value_name = "K")]
        failures: u32,
        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Show the config file path and effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Classify {
                status,
                message,
                code,
                no_response,
                timeout,
                json,
            } => run_classify(status, message, code, no_response, timeout, json)?,
            CliCommand::Statuses => run_statuses(),
            CliCommand::Fetch {
                resource,
                id,
                retry,
            } => {
                let options = retry.apply(cfg.retry_options());
                run_fetch(&cfg, resource, id.as_deref(), options).await?;
            }
            CliCommand::Simulate {
                fail_status,
                failures,
                retry,
            } => {
                let options = retry.apply(cfg.retry_options());
                run_simulate(fail_status, failures, options).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
