//! `hrdesk simulate` – drive the runner with synthetic failures.

use anyhow::Result;
use hrdesk_core::classify::RawFailure;
use hrdesk_core::runner::{RetryOptions, RunOptions, RunOutcome, Runner};
use std::future::ready;
use std::time::Instant;

pub async fn run_simulate(fail_status: u16, failures: u32, retry: RetryOptions) -> Result<()> {
    let runner = Runner::new();
    let started = Instant::now();
    let mut calls = 0u32;
    let work = move || {
        calls += 1;
        if calls <= failures {
            ready(Err(RawFailure::http(fail_status)))
        } else {
            ready(Ok(calls))
        }
    };
    let options = RunOptions::new(retry).on_retry_scheduled(|attempt, delay, err| {
        println!(
            "attempt {:<3} {:<10} retry in {} ms",
            attempt,
            err.kind,
            delay.as_millis()
        );
    });

    let outcome = runner.start(work, options).await?;
    let elapsed = started.elapsed().as_millis();
    match outcome {
        RunOutcome::Succeeded(n) => println!("succeeded on attempt {} after {} ms", n, elapsed),
        RunOutcome::Failed(err) => println!("failed: {} [{} ms]", err, elapsed),
        RunOutcome::Cancelled => println!("cancelled"),
    }
    Ok(())
}
