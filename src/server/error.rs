use crate::error::ArenaError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

/// An [`ArenaError`] on its way out of a handler.
///
/// Carries whether the error source chain may be shown to the client.
#[derive(Debug)]
pub struct ApiError {
    pub error: ArenaError,
    pub expose_stack: bool,
}

impl ApiError {
    pub fn new(error: ArenaError, expose_stack: bool) -> Self {
        Self { error, expose_stack }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> ErrorBody {
        let status_code = self.status().as_u16();

        match &self.error {
            ArenaError::Provider {
                message,
                details,
                source_url,
                ..
            } => ErrorBody {
                status_code,
                message: message.clone(),
                details: details.clone().unwrap_or_else(empty_details),
                source: Some(source_url.clone().unwrap_or_else(|| "external API".to_string())),
                stack: None,
            },
            other => ErrorBody {
                status_code,
                message: other.to_string(),
                details: empty_details(),
                source: None,
                stack: self.expose_stack.then(|| source_chain(other)),
            },
        }
    }
}

impl From<ArenaError> for ApiError {
    fn from(error: ArenaError) -> Self {
        Self::new(error, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.error, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self.error, "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

fn empty_details() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn source_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current = error.source();
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}
