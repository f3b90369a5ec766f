// Shared plumbing for the JSON-over-HTTP provider clients


use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Body;
use ureq::http::Response;

pub(crate) const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Build an agent that hands non-2xx responses back to us so the provider's
/// error body can be reported.
pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: String },
}

/// Perform exactly one request and return the response body on a 2xx status.
///
/// There is no retry: a failed call fails the step that issued it.
pub(crate) fn execute<F>(what: &str, request_fn: F) -> Result<String>
where
    F: FnOnce() -> Result<Response<Body>, ureq::Error>,
{
    let mut response = request_fn().map_err(|error| {
        match &error {
            ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
            | ureq::Error::Timeout(_)
            | ureq::Error::Io(_) => warn!("Transport error during {}: {}", what, error),
            _ => warn!("Request error during {}: {}", what, error),
        }
        anyhow!("{} failed: {}", what, error)
    })?;

    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .with_context(|| format!("Failed to read {} response body", what))?;

    if !status.is_success() {
        let detail = provider_message(&body);
        warn!("{} returned HTTP {}: {}", what, status.as_u16(), detail);
        return Err(anyhow!(
            "{} failed with HTTP {}: {}",
            what,
            status.as_u16(),
            detail
        ));
    }

    debug!("{} succeeded with HTTP {}", what, status.as_u16());
    Ok(body)
}

/// Like [`execute`], then decode the body as JSON
pub(crate) fn execute_json<T, F>(what: &str, request_fn: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> Result<Response<Body>, ureq::Error>,
{
    let body = execute(what, request_fn)?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {} response", what))
}

fn provider_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: Some(ErrorDetail::Object { message } | ErrorDetail::Text(message)),
            ..
        })
        | Ok(ErrorEnvelope {
            message: Some(message),
            ..
        }) => message,
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}
