pub mod anthropic;
pub mod gemini;
mod http;
pub mod openai;
pub mod provider;
pub mod roles;

pub use anthropic::AnthropicDebater;
pub use gemini::GeminiJudge;
pub use openai::OpenAiDebater;
pub use provider::{Debater, Judge, ModelCatalog, ModelInfo, ProviderFactory, Providers, VerdictRequest};
pub use roles::{ChatRole, RoleTable};
