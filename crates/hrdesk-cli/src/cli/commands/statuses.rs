//! `hrdesk statuses` – print the explicit status table.

use hrdesk_core::classify::{status_label, STATUS_TABLE};

pub fn run_statuses() {
    println!("{:<6} {:<24} {:<15} {}", "CODE", "LABEL", "KIND", "RETRY");
    for (code, kind) in STATUS_TABLE {
        println!(
            "{:<6} {:<24} {:<15} {}",
            code,
            status_label(code).unwrap_or("-"),
            kind,
            if kind.is_retryable() { "yes" } else { "no" }
        );
    }
    println!("other 4xx → CLIENT (no retry), other 5xx → SERVER (retry), anything else → UNKNOWN");
}
