use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/ragnet.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Token handed out by the mock login and register routes.
    #[serde(default = "default_mock_token")]
    pub mock_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mock_token: default_mock_token(),
        }
    }
}

fn default_mock_token() -> String {
    "mock-jwt-token".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Artificial processing delay before `/api/query` answers.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}

impl QueryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_permissions")]
    pub permissions: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: default_redirect_uri(),
            permissions: default_permissions(),
        }
    }
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/api/sources/discord/callback".to_string()
}
fn default_permissions() -> String {
    // View Channels + Send Messages + Read Message History
    "68608".to_string()
}

impl DiscordConfig {
    pub fn is_enabled(&self) -> bool {
        self.client_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_format() -> String {
    "compact".to_string()
}

impl Config {
    /// Configuration with every section at its default. Used when no config
    /// file exists on disk.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the config file when it exists, otherwise falls back to
/// [`Config::minimal`]. A file that exists but fails to parse is an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.auth.mock_token.trim().is_empty() {
        anyhow::bail!("auth.mock_token must not be empty");
    }

    // A minute is far beyond any sensible simulated latency
    if config.query.delay_ms > 60_000 {
        anyhow::bail!("query.delay_ms must be <= 60000");
    }

    match config.logging.format.as_str() {
        "pretty" | "compact" | "json" => {}
        other => anyhow::bail!(
            "Unknown logging format: '{}'. Must be pretty, compact, or json.",
            other
        ),
    }

    Ok(())
}
