//! Blocking curl transfer for one REST call.

use curl::easy::{Easy, List};
use std::time::Duration;
use url::Url;

use super::{ApiResponse, Method};
use crate::classify::RawFailure;

/// Everything needed to perform one request off the async runtime.
#[derive(Debug, Clone)]
pub(super) struct Request {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

/// Performs the request. 2xx → `Ok`; any other status or transport failure
/// becomes a `RawFailure` for the classifier.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub(super) fn perform(req: &Request) -> Result<ApiResponse, RawFailure> {
    let mut easy = Easy::new();
    easy.url(req.url.as_str())?;
    easy.follow_location(true)?;
    easy.connect_timeout(req.connect_timeout)?;
    easy.timeout(req.timeout)?;

    let mut headers = List::new();
    headers.append("Accept: application/json")?;
    if req.body.is_some() {
        headers.append("Content-Type: application/json")?;
    }
    if let Some(token) = &req.auth_token {
        headers.append(&format!("Authorization: Bearer {token}"))?;
    }
    easy.http_headers(headers)?;

    match req.method {
        // Fields would otherwise turn the transfer into a POST.
        Method::Get if req.body.is_some() => easy.custom_request("GET")?,
        Method::Get => easy.get(true)?,
        Method::Post => easy.post(true)?,
        Method::Put | Method::Patch | Method::Delete => easy.custom_request(req.method.as_str())?,
    }
    match &req.body {
        Some(body) => easy.post_fields_copy(body)?,
        // Without fields libcurl would read the POST body from stdin.
        None if req.method == Method::Post => easy.post_fields_copy(&[])?,
        None => {}
    }

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    let status = u16::try_from(code).unwrap_or(0);
    tracing::debug!(
        method = req.method.as_str(),
        url = %req.url,
        status,
        bytes = body.len(),
        "request finished"
    );
    if (200..300).contains(&status) {
        Ok(ApiResponse { status, body })
    } else {
        Err(RawFailure::from_response(status, &body))
    }
}
