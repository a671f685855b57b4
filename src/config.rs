//! Configuration and token loading.
//!
//! Setup failures here are the only errors allowed to terminate a run:
//! without credentials and ids there is nothing to reconcile.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub notion: NotionConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Deserialize)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleConfig {
    pub calendar_id: String,

    /// Lower bound for the calendar read, RFC 3339.
    #[serde(default = "default_read_since")]
    pub read_since: String,
}

fn default_read_since() -> String {
    "2024-01-01T00:00:00Z".to_string()
}

/// Google API tokens stored next to the config. Only the access token is
/// used; unknown fields in tokens.json are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub access_token: String,
}

/// Get the config directory path (~/.config/notioncal)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("notioncal");
    Ok(config_dir)
}

/// Get the config file path (~/.config/notioncal/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the tokens file path (~/.config/notioncal/tokens.json)
pub fn tokens_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("tokens.json"))
}

/// Load config from ~/.config/notioncal/config.toml
pub fn load_config() -> Result<Config> {
    let path = config_path()?;

    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}\n\n\
            Create it with your Notion and Google Calendar settings:\n\n\
            [notion]\n\
            api_key = \"secret_...\"\n\
            database_id = \"...\"\n\n\
            [google]\n\
            calendar_id = \"...@group.calendar.google.com\"\n\
            read_since = \"2024-01-01T00:00:00Z\"",
            path.display()
        );
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

    Ok(config)
}

/// Load Google API tokens from ~/.config/notioncal/tokens.json
pub fn load_tokens() -> Result<Tokens> {
    let path = tokens_path()?;

    if !path.exists() {
        anyhow::bail!(
            "Tokens file not found at {}\n\n\
            Store a Google Calendar access token as JSON:\n\n\
            {{ \"access_token\": \"ya29....\" }}",
            path.display()
        );
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read tokens file at {}", path.display()))?;

    let tokens: Tokens = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse tokens file at {}", path.display()))?;

    Ok(tokens)
}
