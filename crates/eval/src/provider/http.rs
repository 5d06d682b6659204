//! Blocking HTTP plumbing shared by the network providers.
//!
//! `ureq` is synchronous, so every call runs on the blocking pool via
//! `tokio::task::spawn_blocking`.

use std::time::Duration;

use serde_json::Value;

use super::ProviderError;

pub(crate) type Headers = Vec<(&'static str, String)>;

fn agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

fn classify(err: ureq::Error, timeout: Duration) -> ProviderError {
    match err {
        ureq::Error::StatusCode(429) => {
            ProviderError::RateLimited("HTTP 429 Too Many Requests".to_string())
        }
        ureq::Error::StatusCode(status) => ProviderError::Api {
            status,
            message: format!("HTTP {}", status),
        },
        ureq::Error::Timeout(_) => ProviderError::Timeout(timeout),
        other => ProviderError::Network(other.to_string()),
    }
}

/// POST a JSON body and return the parsed JSON response.
pub(crate) async fn post_json(
    url: String,
    headers: Headers,
    body: Value,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    tokio::task::spawn_blocking(move || {
        let mut request = agent(timeout)
            .post(&url)
            .header("content-type", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send_json(&body).map_err(|e| classify(e, timeout))?;
        response
            .into_body()
            .read_json::<Value>()
            .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {}", e)))
    })
    .await
    .map_err(|e| ProviderError::Network(format!("task join error: {}", e)))?
}

/// GET `url` and report whether it answered with a success status.
pub(crate) async fn get_ok(url: String, headers: Headers, timeout: Duration) -> bool {
    let result = tokio::task::spawn_blocking(move || {
        let mut request = agent(timeout).get(&url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request.call().map(|_| ())
    })
    .await;
    matches!(result, Ok(Ok(())))
}

/// Trim a trailing slash so paths can be appended with `format!`.
pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
