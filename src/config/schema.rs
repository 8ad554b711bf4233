use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    #[serde(deserialize_with = "openai_section")]
    pub openai: ProviderConfig,
    #[serde(deserialize_with = "anthropic_section")]
    pub anthropic: ProviderConfig,
    #[serde(deserialize_with = "gemini_section")]
    pub gemini: ProviderConfig,
    pub debate: DebateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
            gemini: ProviderConfig::gemini(),
            debate: DebateConfig::default(),
        }
    }
}

impl Config {
    /// Provider configs in `(env var, config)` pairs, in debater A, debater B, judge order.
    pub fn providers(&self) -> [(&'static str, &ProviderConfig); 3] {
        [
            (OPENAI_KEY_VAR, &self.openai),
            (ANTHROPIC_KEY_VAR, &self.anthropic),
            (GEMINI_KEY_VAR, &self.gemini),
        ]
    }
}

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: LogLevel,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub log_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Requests per minute per client; `None` disables rate limiting.
    pub rate_limit_per_minute: Option<u32>,
    /// Timeout applied to every provider request; `0` disables it.
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: Environment::Development,
            rate_limit_per_minute: None,
            request_timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderConfig {
    /// Usually read from the provider's environment variable; never written by `init`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub base_url: String,
    /// Overrides the built-in prompt. `{subject}` (debaters) or `{subject_a}`,
    /// `{subject_b}`, `{arguments_a}`, `{arguments_b}` (judge) are substituted.
    pub system_prompt: Option<String>,
    /// Named alternatives advertised by the `/models` endpoints, e.g. `powerful = "..."`.
    pub alternative_models: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn openai() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            alternative_models: BTreeMap::from([(
                "powerful".to_string(),
                "o1-preview".to_string(),
            )]),
            max_tokens: 500,
            temperature: 0.6,
            base_url: "https://api.openai.com".to_string(),
            system_prompt: None,
        }
    }

    pub fn anthropic() -> Self {
        Self {
            api_key: None,
            model: "claude-3-haiku-20240307".to_string(),
            alternative_models: BTreeMap::from([
                ("powerful".to_string(), "claude-3-opus-20240229".to_string()),
                ("balanced".to_string(), "claude-3-sonnet-20240229".to_string()),
            ]),
            max_tokens: 500,
            temperature: 0.8,
            base_url: "https://api.anthropic.com".to_string(),
            system_prompt: None,
        }
    }

    pub fn gemini() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            alternative_models: BTreeMap::from([(
                "powerful".to_string(),
                "gemini-1.5-pro".to_string(),
            )]),
            max_tokens: 500,
            temperature: 0.5,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            system_prompt: None,
        }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

/// A provider table as written in the file. Unset keys keep the provider's defaults,
/// so a partial `[anthropic]` table does not inherit another provider's endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProviderSection {
    api_key: Option<String>,
    model: Option<String>,
    alternative_models: Option<BTreeMap<String, String>>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    base_url: Option<String>,
    system_prompt: Option<String>,
}

impl ProviderSection {
    fn apply(self, mut base: ProviderConfig) -> ProviderConfig {
        if self.api_key.is_some() {
            base.api_key = self.api_key;
        }
        if let Some(model) = self.model {
            base.model = model;
        }
        if let Some(alternatives) = self.alternative_models {
            base.alternative_models = alternatives;
        }
        if let Some(max_tokens) = self.max_tokens {
            base.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
        if let Some(base_url) = self.base_url {
            base.base_url = base_url;
        }
        if self.system_prompt.is_some() {
            base.system_prompt = self.system_prompt;
        }
        base
    }
}

fn openai_section<'de, D: Deserializer<'de>>(d: D) -> Result<ProviderConfig, D::Error> {
    ProviderSection::deserialize(d).map(|s| s.apply(ProviderConfig::openai()))
}

fn anthropic_section<'de, D: Deserializer<'de>>(d: D) -> Result<ProviderConfig, D::Error> {
    ProviderSection::deserialize(d).map(|s| s.apply(ProviderConfig::anthropic()))
}

fn gemini_section<'de, D: Deserializer<'de>>(d: D) -> Result<ProviderConfig, D::Error> {
    ProviderSection::deserialize(d).map(|s| s.apply(ProviderConfig::gemini()))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebateConfig {
    pub default_rounds: u32,
    pub max_rounds: u32,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            default_rounds: 2,
            max_rounds: 3,
        }
    }
}
