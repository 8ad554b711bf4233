use crate::ai::http::send_json;
use crate::ai::provider::{configured_catalog, Judge, ModelCatalog, ModelInfo, VerdictRequest};
use crate::config::ProviderConfig;
use crate::debate::verdict::judge_prompt;
use crate::error::{ArenaResult, ProviderName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Judge: Gemini `generateContent`, single user turn.
pub struct GeminiJudge {
    client: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiJudge {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn build_request(&self, request: &VerdictRequest) -> GenerateRequest {
        let prompt = judge_prompt(
            self.config.system_prompt.as_deref(),
            &request.subject_a,
            &request.subject_b,
            &request.arguments_a,
            &request.arguments_b,
        );

        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

/// All text parts of the first candidate, concatenated.
fn extract_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn judge(&self, request: &VerdictRequest) -> ArenaResult<String> {
        tracing::debug!(
            subject_a = %request.subject_a,
            subject_b = %request.subject_b,
            arguments_a = request.arguments_a.len(),
            arguments_b = request.arguments_b.len(),
            "Requesting Gemini verdict"
        );

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let response: GenerateResponse = send_json(
            ProviderName::Gemini,
            self.client
                .post(url)
                .header(API_KEY_HEADER, self.config.api_key())
                .json(&self.build_request(request)),
        )
        .await?;

        let verdict = extract_text(response);
        tracing::debug!(length = verdict.len(), "Received Gemini verdict");
        Ok(verdict)
    }
}

#[async_trait]
impl ModelCatalog for GeminiJudge {
    async fn list_models(&self) -> ArenaResult<Vec<ModelInfo>> {
        Ok(configured_catalog(&self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::error::ApiError;

    fn request() -> VerdictRequest {
        VerdictRequest {
            subject_a: "Pikachu".to_string(),
            subject_b: "Charizard".to_string(),
            arguments_a: vec!["Fast.".to_string()],
            arguments_b: vec!["Fire.".to_string(), "Flight.".to_string()],
        }
    }

    #[test]
    fn request_wire_shape() {
        let judge = GeminiJudge::new(reqwest::Client::new(), ProviderConfig::gemini());
        let json = serde_json::to_value(judge.build_request(&request())).unwrap();

        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(json["contents"][0]["role"], "user");
        let prompt = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Fire. | Flight."));
        assert!(prompt.contains("Pikachu"));
    }

    #[test]
    fn concatenates_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"role":"model","parts":[{"text":"Sparks fly. "},{"text":"WINNER: Pikachu"}]}},
                {"content":{"role":"model","parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response), "Sparks fly. WINNER: Pikachu");

        let blocked: GenerateResponse = serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(extract_text(blocked), "");
    }

    #[tokio::test]
    async fn unreachable_host_does_not_leak_key() {
        let mut config = ProviderConfig::gemini();
        config.api_key = Some("SECRET-GEMINI-KEY".to_string());
        config.base_url = "http://127.0.0.1:1".to_string();
        let judge = GeminiJudge::new(reqwest::Client::new(), config);

        let err = judge.judge(&request()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(!err.to_string().contains("SECRET-GEMINI-KEY"));

        let body = ApiError::new(err, true).body();
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("SECRET-GEMINI-KEY"), "{}", json);
        assert!(!json.contains("key="), "{}", json);
    }
}
