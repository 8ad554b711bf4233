use crate::ai::http::send_json;
use crate::ai::provider::{configured_catalog, Debater, ModelCatalog, ModelInfo};
use crate::ai::roles::{ChatRole, ANTHROPIC_ROLES};
use crate::config::ProviderConfig;
use crate::debate::DebateMessage;
use crate::error::{ArenaResult, ProviderName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";

const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI debater who argues that {subject} is superior. You are a fearless idealist who believes in fair play and honor, always standing by your convictions. Your unwavering faith in justice sometimes makes you overlook deception, but your heart is always in the fight. Respond with 3 sentences maximum.";

/// Debater B: Anthropic messages API.
pub struct AnthropicDebater {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Turn>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, PartialEq)]
struct Turn {
    role: ChatRole,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicDebater {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn system_prompt(&self, subject: &str) -> String {
        self.config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .replace("{subject}", subject)
    }
}

/// History in this debater's roles. With nothing to answer yet, Claude still needs a
/// user turn, so the debate is opened on its behalf.
fn build_turns(history: &[DebateMessage], subject: &str) -> Vec<Turn> {
    let turns: Vec<Turn> = ANTHROPIC_ROLES
        .map_history(history)
        .into_iter()
        .map(|(role, content)| Turn {
            role,
            content: content.to_string(),
        })
        .collect();

    if turns.is_empty() {
        return vec![Turn {
            role: ChatRole::User,
            content: format!("Let's start a debate. Tell me why {} is superior.", subject),
        }];
    }
    turns
}

/// Text blocks joined by a single space; other block types are ignored.
fn extract_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Debater for AnthropicDebater {
    async fn argue(&self, history: &[DebateMessage], subject: &str) -> ArenaResult<String> {
        let system = self.system_prompt(subject);
        let request = MessagesRequest {
            model: &self.config.model,
            system: &system,
            messages: build_turns(history, subject),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!(
            subject,
            history = history.len(),
            messages = request.messages.len(),
            "Requesting Anthropic argument"
        );

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response: MessagesResponse = send_json(
            ProviderName::Anthropic,
            self.client
                .post(url)
                .header("x-api-key", self.config.api_key())
                .header("anthropic-version", API_VERSION)
                .json(&request),
        )
        .await?;

        let text = extract_text(response);
        tracing::debug!(length = text.len(), "Received Anthropic argument");
        Ok(text)
    }
}

#[async_trait]
impl ModelCatalog for AnthropicDebater {
    async fn list_models(&self) -> ArenaResult<Vec<ModelInfo>> {
        Ok(configured_catalog(&self.config))
    }
}
