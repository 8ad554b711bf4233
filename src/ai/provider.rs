use crate::ai::anthropic::AnthropicDebater;
use crate::ai::gemini::GeminiJudge;
use crate::ai::http;
use crate::ai::openai::OpenAiDebater;
use crate::config::{Config, ProviderConfig};
use crate::debate::DebateMessage;
use crate::error::ArenaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A provider that argues for one subject given the debate so far.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Debater: Send + Sync {
    /// Produce the next statement. An empty string is a valid (if weak) turn.
    async fn argue(&self, history: &[DebateMessage], subject: &str) -> ArenaResult<String>;
}

/// A provider that reads both sides and declares a winner.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Judge: Send + Sync {
    /// Raw judge text; see [`crate::debate::Verdict::from_judge_text`] for parsing.
    async fn judge(&self, request: &VerdictRequest) -> ArenaResult<String>;
}

/// Models a provider can be asked to use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> ArenaResult<Vec<ModelInfo>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictRequest {
    pub subject_a: String,
    pub subject_b: String,
    pub arguments_a: Vec<String>,
    pub arguments_b: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub is_default: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(rename = "owned_by", default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

impl ModelInfo {
    pub fn named(id: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: id.into(),
            is_default,
            kind: None,
            created: None,
            owned_by: None,
        }
    }
}

/// The configured default model followed by the named alternatives.
///
/// Used for providers without a usable listing endpoint.
pub fn configured_catalog(config: &ProviderConfig) -> Vec<ModelInfo> {
    std::iter::once(ModelInfo::named(&config.model, true))
        .chain(config.alternative_models.iter().map(|(kind, id)| ModelInfo {
            kind: Some(kind.clone()),
            ..ModelInfo::named(id, false)
        }))
        .collect()
}

/// Everything the debate needs from the outside world.
#[derive(Clone)]
pub struct Providers {
    pub debater_a: Arc<dyn Debater>,
    pub debater_b: Arc<dyn Debater>,
    pub judge: Arc<dyn Judge>,
    pub openai_models: Arc<dyn ModelCatalog>,
    pub anthropic_models: Arc<dyn ModelCatalog>,
    pub gemini_models: Arc<dyn ModelCatalog>,
}

/// Factory for the real HTTP-backed providers
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &Config) -> ArenaResult<Providers> {
        let client = http::build_client(config.server.request_timeout_seconds)?;

        let openai = Arc::new(OpenAiDebater::new(client.clone(), config.openai.clone()));
        let anthropic = Arc::new(AnthropicDebater::new(client.clone(), config.anthropic.clone()));
        let gemini = Arc::new(GeminiJudge::new(client, config.gemini.clone()));

        Ok(Providers {
            debater_a: openai.clone(),
            debater_b: anthropic.clone(),
            judge: gemini.clone(),
            openai_models: openai,
            anthropic_models: anthropic,
            gemini_models: gemini,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_catalog_lists_default_first() {
        let models = configured_catalog(&ProviderConfig::anthropic());
        assert_eq!(models.len(), 3);
        assert_eq!(models[0], ModelInfo::named("claude-3-haiku-20240307", true));
        assert!(models[1..].iter().all(|m| !m.is_default && m.kind.is_some()));
        assert_eq!(models, configured_catalog(&ProviderConfig::anthropic()));
    }

    #[test]
    fn model_info_wire_shape() {
        let json = serde_json::to_value(&configured_catalog(&ProviderConfig::gemini())).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "id": "gemini-1.5-flash", "isDefault": true },
                { "id": "gemini-1.5-pro", "isDefault": false, "type": "powerful" }
            ])
        );
    }
}
