//! `hrdesk classify` – classify a described failure.

use anyhow::Result;
use hrdesk_core::classify::{classify, RawFailure};

pub fn run_classify(
    status: Option<u16>,
    message: Option<String>,
    code: Option<String>,
    no_response: bool,
    timeout: bool,
    json: bool,
) -> Result<()> {
    let raw = RawFailure {
        transport_present: !no_response,
        http_status: status,
        server_message: message,
        server_code: code,
        is_timeout: timeout,
    };
    let classified = classify(&raw);
    if json {
        println!("{}", serde_json::to_string_pretty(&classified)?);
        return Ok(());
    }
    println!("kind:      {}", classified.kind);
    println!("retryable: {}", classified.is_retryable);
    if let Some(status) = classified.http_status {
        let label = classified.status_label().unwrap_or("-");
        println!("status:    {} {}", status, label);
    }
    if let Some(code) = &classified.server_code {
        println!("code:      {}", code);
    }
    println!("message:   {}", classified.message);
    Ok(())
}
