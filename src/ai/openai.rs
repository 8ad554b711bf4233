use crate::ai::http::send_json;
use crate::ai::provider::{Debater, ModelCatalog, ModelInfo};
use crate::ai::roles::{ChatRole, OPENAI_ROLES};
use crate::config::ProviderConfig;
use crate::debate::DebateMessage;
use crate::error::{ArenaResult, ProviderName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI debater who argues that {subject} is superior. You are a ruthless strategist who exploits every weakness in your opponent's argument, leaving no room for mercy. Your tactics are sharp, relentless, and designed to dominate. 2 sentences max.";

/// Debater A: OpenAI chat completions.
pub struct OpenAiDebater {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<RemoteModel>,
}

#[derive(Debug, Deserialize)]
struct RemoteModel {
    id: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    owned_by: Option<String>,
}

impl OpenAiDebater {
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

/// System message first, then the history in this debater's roles.
fn build_messages<'a>(system: &'a str, history: &'a [DebateMessage]) -> Vec<ChatMessage<'a>> {
    std::iter::once(ChatMessage {
        role: ChatRole::System,
        content: system,
    })
    .chain(
        OPENAI_ROLES
            .map_history(history)
            .into_iter()
            .map(|(role, content)| ChatMessage { role, content }),
    )
    .collect()
}

fn extract_text(response: ChatResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default()
}

/// Chat models only, newest first.
fn chat_models(list: ModelList, default_model: &str) -> Vec<ModelInfo> {
    let mut models: Vec<RemoteModel> = list
        .data
        .into_iter()
        .filter(|m| m.id.contains("gpt"))
        .collect();
    models.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));

    models
        .into_iter()
        .map(|m| ModelInfo {
            is_default: m.id == default_model,
            created: Some(m.created),
            owned_by: m.owned_by,
            ..ModelInfo::named(m.id, false)
        })
        .collect()
}

#[async_trait]
impl Debater for OpenAiDebater {
    async fn argue(&self, history: &[DebateMessage], subject: &str) -> ArenaResult<String> {
        let system = self.system_prompt(subject);
        let request = ChatRequest {
            model: &self.config.model,
            messages: build_messages(&system, history),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!(
            subject,
            history = history.len(),
            messages = request.messages.len(),
            "Requesting OpenAI argument"
        );

        let response: ChatResponse = send_json(
            ProviderName::OpenAi,
            self.client
                .post(self.url("/v1/chat/completions"))
                .bearer_auth(self.config.api_key())
                .json(&request),
        )
        .await?;

        let text = extract_text(response);
        tracing::debug!(length = text.len(), "Received OpenAI argument");
        Ok(text)
    }
}

#[async_trait]
impl ModelCatalog for OpenAiDebater {
    async fn list_models(&self) -> ArenaResult<Vec<ModelInfo>> {
        let list: ModelList = send_json(
            ProviderName::OpenAi,
            self.client
                .get(self.url("/v1/models"))
                .bearer_auth(self.config.api_key()),
        )
        .await?;

        let models = chat_models(list, &self.config.model);
        tracing::debug!(count = models.len(), "Retrieved OpenAI models");
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::Speaker;

    #[test]
    fn system_message_leads_history() {
        let history = vec![
            DebateMessage::new(Speaker::DebaterA, "Pikachu is fast.", 1),
            DebateMessage::new(Speaker::DebaterB, "Charizard flies.", 1),
        ];
        let messages = build_messages("sys", &history);
        assert_eq!(
            messages,
            vec![
                ChatMessage { role: ChatRole::System, content: "sys" },
                ChatMessage { role: ChatRole::Assistant, content: "Pikachu is fast." },
                ChatMessage { role: ChatRole::User, content: "Charizard flies." },
            ]
        );
    }

    #[test]
    fn empty_history_sends_only_system() {
        assert_eq!(build_messages("sys", &[]).len(), 1);
    }

    #[test]
    fn request_wire_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: build_messages("sys", &[]),
            max_tokens: 500,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "system", "content": "sys" }],
                "max_tokens": 500,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn missing_content_is_empty_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap();
        assert_eq!(extract_text(response), "");

        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(extract_text(none), "");

        let some: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"Volt Tackle wins."}}]}"#).unwrap();
        assert_eq!(extract_text(some), "Volt Tackle wins.");
    }

    #[test]
    fn model_listing_filters_and_sorts() {
        let list: ModelList = serde_json::from_str(
            r#"{"data":[
                {"id":"gpt-3.5-turbo","created":100,"owned_by":"openai"},
                {"id":"whisper-1","created":300,"owned_by":"openai"},
                {"id":"gpt-4o-mini","created":200,"owned_by":"system"}
            ]}"#,
        )
        .unwrap();

        let models = chat_models(list, "gpt-4o-mini");
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-4o-mini", "gpt-3.5-turbo"]);
        assert!(models[0].is_default);
        assert!(!models[1].is_default);
        assert_eq!(models[0].owned_by.as_deref(), Some("system"));
    }

    #[test]
    fn prompt_template_substitutes_subject() {
        let debater = OpenAiDebater::new(reqwest::Client::new(), ProviderConfig::openai());
        assert!(debater.system_prompt("Pikachu").starts_with("You are an AI debater who argues that Pikachu is superior."));
    }
}
