use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArenaError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse config at {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing required environment variable(s): {}", .0.join(", "))]
    MissingApiKeys(Vec<String>),

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("Too many requests, please try again later")]
    TooManyRequests,

    // AI provider errors
    #[error("{provider} API error: {message}")]
    Provider {
        provider: ProviderName,
        kind: ProviderErrorKind,
        message: String,
        details: Option<serde_json::Value>,
        source_url: Option<String>,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: ProviderName,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {provider} response: {message}")]
    ResponseParse {
        provider: ProviderName,
        message: String,
    },

    // Debate errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Debate run {0} was cancelled")]
    Cancelled(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upstream service that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderName {
    OpenAi,
    Anthropic,
    Gemini,
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Anthropic => write!(f, "Anthropic"),
            Self::Gemini => write!(f, "Gemini"),
        }
    }
}

/// Coarse classification of a provider failure, used to pick the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Unauthorized,
    RateLimited,
    ContextTooLong,
    Upstream,
}

impl ProviderErrorKind {
    /// Classify from the upstream HTTP status, the provider's error code and its message.
    ///
    /// Status codes win over message sniffing; message checks run in the order
    /// OpenAI, Anthropic, Gemini phrase their errors.
    pub fn classify(status: Option<u16>, code: Option<&str>, message: &str) -> Self {
        match status {
            Some(401) => return Self::Unauthorized,
            Some(429) => return Self::RateLimited,
            _ => {}
        }
        if code == Some("context_length_exceeded") {
            return Self::ContextTooLong;
        }

        let lower = message.to_lowercase();
        if lower.contains("authentication") {
            Self::Unauthorized
        } else if lower.contains("rate limit") {
            Self::RateLimited
        } else if lower.contains("api key") {
            Self::Unauthorized
        } else if lower.contains("quota") {
            Self::RateLimited
        } else {
            Self::Upstream
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::RateLimited => 429,
            Self::ContextTooLong => 413,
            Self::Upstream => 500,
        }
    }
}

impl ArenaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::TooManyRequests => 429,
            Self::Cancelled(_) => 409,
            Self::Provider { kind, .. } => kind.status_code(),
            _ => 500,
        }
    }
}

impl From<toml::de::Error> for ArenaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type ArenaResult<T> = Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wins_over_message() {
        assert_eq!(
            ProviderErrorKind::classify(Some(401), None, "quota exceeded"),
            ProviderErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderErrorKind::classify(Some(429), None, ""),
            ProviderErrorKind::RateLimited
        );
    }

    #[test]
    fn classifies_provider_phrasing() {
        assert_eq!(
            ProviderErrorKind::classify(Some(400), Some("context_length_exceeded"), "too long"),
            ProviderErrorKind::ContextTooLong
        );
        assert_eq!(
            ProviderErrorKind::classify(None, None, "invalid x-api-key: authentication_error"),
            ProviderErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderErrorKind::classify(Some(400), None, "API key not valid. Please pass a valid API key."),
            ProviderErrorKind::Unauthorized
        );
        assert_eq!(
            ProviderErrorKind::classify(Some(403), None, "You exceeded your current quota"),
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            ProviderErrorKind::classify(Some(500), None, "overloaded"),
            ProviderErrorKind::Upstream
        );
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(ArenaError::validation("Missing required parameter: pokemonA").status_code(), 400);
        assert_eq!(ArenaError::TooManyRequests.status_code(), 429);
        let err = ArenaError::Provider {
            provider: ProviderName::Gemini,
            kind: ProviderErrorKind::ContextTooLong,
            message: "too long".to_string(),
            details: None,
            source_url: None,
        };
        assert_eq!(err.status_code(), 413);
        assert_eq!(ArenaError::InvalidState("idle".to_string()).status_code(), 500);
        assert_eq!(ArenaError::Cancelled("run".to_string()).status_code(), 409);
    }
}
