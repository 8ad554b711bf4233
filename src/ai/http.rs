use crate::error::{ArenaError, ArenaResult, ProviderErrorKind, ProviderName};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_client(timeout_seconds: u64) -> ArenaResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout_seconds > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_seconds));
    }
    builder
        .build()
        .map_err(|e| ArenaError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Send once and decode a successful JSON body. Non-2xx responses become a
/// classified [`ArenaError::Provider`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderName,
    request: reqwest::RequestBuilder,
) -> ArenaResult<T> {
    let response = request
        .send()
        .await
        .map_err(|source| ArenaError::Transport {
            provider,
            source: source.without_url(),
        })?;

    let status = response.status();
    if !status.is_success() {
        // Only scheme, host and path; query strings never reach a client.
        let url = response.url();
        let source_url = format!("{}://{}{}", url.scheme(), url.host_str().unwrap_or_default(), url.path());
        let body = response.text().await.unwrap_or_default();
        return Err(provider_error(provider, Some(status.as_u16()), &body, Some(source_url)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ArenaError::ResponseParse {
            provider,
            message: e.without_url().to_string(),
        })
}

/// Build a provider error from an error body. All three providers wrap details as
/// `{"error": {"message": ..., "code"|"type"|"status": ...}}`.
pub(crate) fn provider_error(
    provider: ProviderName,
    status: Option<u16>,
    body: &str,
    source_url: Option<String>,
) -> ArenaError {
    let details: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = details.as_ref().and_then(|d| d.get("error"));

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| match status {
            Some(code) if body.trim().is_empty() => format!("HTTP {}", code),
            _ => body.trim().to_string(),
        });
    let code = error.and_then(|e| e.get("code")).and_then(|c| c.as_str());

    // Classify on the whole body: Anthropic puts "authentication_error" in `type`,
    // not in the message.
    let kind = ProviderErrorKind::classify(status, code, &format!("{} {}", message, body));

    ArenaError::Provider {
        provider,
        kind,
        message,
        details,
        source_url,
    }
}
