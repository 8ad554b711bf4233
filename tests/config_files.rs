use debate_arena::config::{self, Config, Environment};
use debate_arena::error::ArenaError;
use std::io::Write;

#[test]
fn partial_provider_table_keeps_that_providers_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 8080
environment = "production"
rate_limit_per_minute = 50

[gemini]
model = "gemini-1.5-pro"

[debate]
default_rounds = 3
"#
    )
    .unwrap();

    let config = config::load_config(file.path()).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.environment, Environment::Production);
    assert_eq!(config.server.rate_limit_per_minute, Some(50));
    assert_eq!(config.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
    assert_eq!(config.openai.model, "gpt-4o-mini");
    assert_eq!(config.debate.default_rounds, 3);
    assert_eq!(config.debate.max_rounds, 3);
}

#[test]
fn serve_lists_every_missing_key() {
    let mut config = Config::default();
    config::apply_env_overrides(&mut config, |name| {
        (name == "ANTHROPIC_API_KEY").then(|| "sk-ant-test".to_string())
    })
    .unwrap();

    match config::require_api_keys(&config) {
        Err(ArenaError::MissingApiKeys(missing)) => {
            assert_eq!(missing, vec!["OPENAI_API_KEY", "GEMINI_API_KEY"]);
        }
        other => panic!("expected missing keys, got {:?}", other),
    }
}

#[test]
fn unknown_provider_field_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[openai]\nmodle = \"gpt-4o\"").unwrap();

    assert!(matches!(
        config::load_config(file.path()),
        Err(ArenaError::ConfigParse { .. })
    ));
}
