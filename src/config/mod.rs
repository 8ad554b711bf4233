mod schema;

pub use schema::*;

use crate::error::{ArenaError, ArenaResult};
use std::path::{Path, PathBuf};

/// Get the OS-appropriate config directory for debate-arena
/// - Linux: ~/.config/debate-arena
/// - macOS: ~/Library/Application Support/debate-arena
/// - Windows: %APPDATA%\debate-arena
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("debate-arena"))
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("debate-arena.toml"))
}

pub fn load_config(path: &Path) -> ArenaResult<Config> {
    if !path.exists() {
        return Err(ArenaError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| ArenaError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(config)
}

/// Load the file at `path`, falling back to the user config directory and then to
/// defaults, and apply environment overrides on top.
pub fn resolve_config(path: &Path) -> ArenaResult<Config> {
    let mut config = if path.exists() {
        load_config(path)?
    } else if let Some(user_path) = default_config_path().filter(|p| p.exists()) {
        load_config(&user_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Overlay API keys, `PORT` and `APP_ENV` from the environment.
///
/// `lookup` is injectable so overrides can be tested without touching process env.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ArenaResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(OPENAI_KEY_VAR) {
        config.openai.api_key = Some(key);
    }
    if let Some(key) = non_empty(ANTHROPIC_KEY_VAR) {
        config.anthropic.api_key = Some(key);
    }
    if let Some(key) = non_empty(GEMINI_KEY_VAR) {
        config.gemini.api_key = Some(key);
    }

    if let Some(port) = non_empty("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ArenaError::Config(format!("PORT must be a port number, got '{}'", port)))?;
    }

    if let Some(env) = non_empty("APP_ENV") {
        config.server.environment = env.parse().map_err(ArenaError::Config)?;
    }

    Ok(())
}

/// Names of provider key variables that have no value.
pub fn missing_api_keys(config: &Config) -> Vec<String> {
    config
        .providers()
        .iter()
        .filter(|(_, provider)| provider.api_key().trim().is_empty())
        .map(|(var, _)| var.to_string())
        .collect()
}

/// Fail with every missing key listed, rather than the first one found.
pub fn require_api_keys(config: &Config) -> ArenaResult<()> {
    let missing = missing_api_keys(config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArenaError::MissingApiKeys(missing))
    }
}

pub fn create_default_config(path: &Path) -> ArenaResult<()> {
    save_config(path, &Config::default())
}

/// Save config to a file, creating parent directories if needed
pub fn save_config(path: &Path, config: &Config) -> ArenaResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| ArenaError::Serialization(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}
