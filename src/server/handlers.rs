use crate::ai::{ModelInfo, VerdictRequest};
use crate::debate::{DebateMessage, DebateOrchestrator, Speaker};
use crate::error::ArenaError;
use crate::server::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebaterARequest {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    pub pokemon_a: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebaterBRequest {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    pub pokemon_b: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictBody {
    pub gpt_messages: Option<Vec<String>>,
    pub claude_messages: Option<Vec<String>>,
    pub pokemon_a: Option<String>,
    pub pokemon_b: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateBody {
    pub pokemon_a: Option<String>,
    pub pokemon_b: Option<String>,
    pub rounds: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateResponse {
    pub id: String,
    pub pokemon_a: String,
    pub pokemon_b: String,
    pub rounds: u32,
    pub transcript: Vec<DebateMessage>,
    pub verdict: String,
    pub winner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundBody {
    pub status_code: u16,
    pub message: &'static str,
    pub path: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Validation error naming every missing field, in request order.
fn missing_parameters(fields: &[(&str, bool)]) -> Option<ArenaError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, is_present)| !is_present)
        .map(|(name, _)| *name)
        .collect();

    match missing.as_slice() {
        [] => None,
        [single] if fields.len() == 1 => Some(ArenaError::validation(format!(
            "Missing required parameter: {}",
            single
        ))),
        _ => Some(ArenaError::validation(format!(
            "Missing required parameter(s): {}",
            missing.join(", ")
        ))),
    }
}

fn parse_body<T>(state: &AppState, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| state.reject(ArenaError::validation(rejection.body_text())))
}

/// Client history to debate messages. Unknown roles are dropped. Clients do not
/// send rounds, so each debater A turn opens the next one.
fn to_history(messages: &[WireMessage]) -> Vec<DebateMessage> {
    let mut round: u32 = 0;
    messages
        .iter()
        .filter_map(|m| Speaker::from_wire(&m.role).map(|role| (role, m.content.as_str())))
        .map(|(role, content)| {
            if role == Speaker::DebaterA {
                round = round.saturating_add(1);
            }
            DebateMessage::new(role, content, round.max(1))
        })
        .collect()
}

pub async fn debater_a(
    State(state): State<AppState>,
    payload: Result<Json<DebaterARequest>, JsonRejection>,
) -> ApiResult<String> {
    let body = parse_body(&state, payload)?;
    let subject = match present(&body.pokemon_a) {
        Some(subject) => subject,
        None => return Err(state.reject(ArenaError::validation("Missing required parameter: pokemonA"))),
    };

    let history = to_history(&body.messages);
    tracing::info!(subject, messages = history.len(), "Generating debater A response");

    let text = state
        .providers
        .debater_a
        .argue(&history, subject)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(text))
}

pub async fn debater_b(
    State(state): State<AppState>,
    payload: Result<Json<DebaterBRequest>, JsonRejection>,
) -> ApiResult<String> {
    let body = parse_body(&state, payload)?;
    let subject = match present(&body.pokemon_b) {
        Some(subject) => subject,
        None => return Err(state.reject(ArenaError::validation("Missing required parameter: pokemonB"))),
    };

    let history = to_history(&body.messages);
    tracing::info!(subject, messages = history.len(), "Generating debater B response");

    let text = state
        .providers
        .debater_b
        .argue(&history, subject)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(text))
}

pub async fn verdict(
    State(state): State<AppState>,
    payload: Result<Json<VerdictBody>, JsonRejection>,
) -> ApiResult<String> {
    let body = parse_body(&state, payload)?;
    if let Some(err) = missing_parameters(&[
        ("gptMessages", body.gpt_messages.is_some()),
        ("claudeMessages", body.claude_messages.is_some()),
        ("pokemonA", present(&body.pokemon_a).is_some()),
        ("pokemonB", present(&body.pokemon_b).is_some()),
    ]) {
        return Err(state.reject(err));
    }

    let request = VerdictRequest {
        subject_a: body.pokemon_a.unwrap_or_default(),
        subject_b: body.pokemon_b.unwrap_or_default(),
        arguments_a: body.gpt_messages.unwrap_or_default(),
        arguments_b: body.claude_messages.unwrap_or_default(),
    };
    tracing::info!(
        subject_a = %request.subject_a,
        subject_b = %request.subject_b,
        "Generating verdict"
    );

    let text = state
        .providers
        .judge
        .judge(&request)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(text))
}

pub async fn debate(
    State(state): State<AppState>,
    payload: Result<Json<DebateBody>, JsonRejection>,
) -> ApiResult<DebateResponse> {
    let body = parse_body(&state, payload)?;
    let (subject_a, subject_b) = match (present(&body.pokemon_a), present(&body.pokemon_b)) {
        (Some(a), Some(b)) => (a, b),
        (a, b) => {
            let err = missing_parameters(&[("pokemonA", a.is_some()), ("pokemonB", b.is_some())])
                .unwrap_or_else(|| ArenaError::validation("Invalid debate request"));
            return Err(state.reject(err));
        }
    };
    let rounds = body.rounds.unwrap_or(state.debate.default_rounds);

    let mut orchestrator = DebateOrchestrator::from_providers(&state.providers, &state.debate);
    orchestrator
        .start(subject_a, subject_b, rounds)
        .map_err(|e| state.reject(e))?;
    state.replace_current_run(orchestrator.cancel_handle());

    let run = orchestrator.run().await.map_err(|e| state.reject(e))?;
    let verdict = run
        .verdict
        .as_ref()
        .ok_or_else(|| state.reject(ArenaError::InvalidState("debate finished without a verdict".to_string())))?;

    let winner = verdict
        .winner_name(&run.subject_a, &run.subject_b)
        .map(str::to_string);

    Ok(Json(DebateResponse {
        id: run.id.to_string(),
        pokemon_a: run.subject_a.clone(),
        pokemon_b: run.subject_b.clone(),
        rounds: run.rounds,
        transcript: run.transcript.messages().to_vec(),
        verdict: verdict.text.clone(),
        winner,
    }))
}

pub async fn openai_models(State(state): State<AppState>) -> ApiResult<Vec<ModelInfo>> {
    list_models(&state, "OpenAI", state.providers.openai_models.list_models().await)
}

pub async fn anthropic_models(State(state): State<AppState>) -> ApiResult<Vec<ModelInfo>> {
    list_models(&state, "Anthropic", state.providers.anthropic_models.list_models().await)
}

pub async fn gemini_models(State(state): State<AppState>) -> ApiResult<Vec<ModelInfo>> {
    list_models(&state, "Gemini", state.providers.gemini_models.list_models().await)
}

fn list_models(
    state: &AppState,
    provider: &str,
    result: Result<Vec<ModelInfo>, ArenaError>,
) -> ApiResult<Vec<ModelInfo>> {
    let models = result.map_err(|e| state.reject(e))?;
    tracing::info!(provider, count = models.len(), "Retrieved models");
    Ok(Json(models))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

pub async fn not_found(uri: Uri) -> (StatusCode, Json<NotFoundBody>) {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    tracing::warn!(%path, "Route not found");

    (
        StatusCode::NOT_FOUND,
        Json(NotFoundBody {
            status_code: 404,
            message: "Resource not found",
            path,
        }),
    )
}
