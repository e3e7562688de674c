//! Shared HTTP plumbing: client construction and status mapping.

use crate::error::{GraphError, Result};
use crate::models::ErrorEnvelope;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("sharepath/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(GraphError::Request)
}

/// Pass successful responses through, map the rest onto [`GraphError`].
///
/// `what` names the addressed resource in the resulting error.
pub(crate) async fn check(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        warn!(resource = %what, retry_after, "Graph is throttling requests");
        return Err(GraphError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    let message = error_message(response).await;
    Err(match status {
        StatusCode::UNAUTHORIZED => GraphError::Unauthorized(message),
        StatusCode::NOT_FOUND => GraphError::NotFound(what.to_string()),
        StatusCode::CONFLICT => GraphError::Conflict(what.to_string()),
        _ => GraphError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

/// Decode a JSON body, reporting failures as parse errors.
pub(crate) async fn json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| GraphError::Parse(format!("Failed to parse {what}: {e}")))
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) if envelope.error.code.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{}: {}", envelope.error.code, envelope.error.message),
        Err(_) => text,
    }
}
