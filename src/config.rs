use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MemoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub scheduler: SchedulerConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `remote` (OpenAI-compatible `/embeddings`) or `hashed` (offline, deterministic).
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub intent_model: String,
    pub compose_model: String,
    pub temperature: f32,
    pub max_history_turns: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// `brave` or `none`.
    pub backend: String,
    pub api_key: String,
    pub results_per_query: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    pub bot_token: String,
    pub api_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_memo_dir()
            .join("memogenius.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "remote".into(),
            model: "text-embedding-004".into(),
            base_url: GEMINI_OPENAI_BASE.into(),
            api_key: String::new(),
            dimensions: 768,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_OPENAI_BASE.into(),
            api_key: String::new(),
            intent_model: "gemini-2.0-flash".into(),
            compose_model: "gemini-2.0-flash".into(),
            temperature: 0.0,
            max_history_turns: 20,
            timeout_secs: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
            api_key: String::new(),
            results_per_query: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".into(),
        }
    }
}

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Returns `~/.memogenius/`
pub fn default_memo_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memogenius")
}

/// Returns the default config file path: `~/.memogenius/config.toml`
pub fn default_config_path() -> PathBuf {
    default_memo_dir().join("config.toml")
}

impl MemoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `MEMO_DB`, `MEMO_LOG_LEVEL`, `MEMO_LLM_API_KEY` (falls back to `GEMINI_API_KEY`),
    /// `MEMO_BOT_TOKEN`, `MEMO_SEARCH_API_KEY`. The LLM key doubles as the embedding
    /// key when no dedicated one is configured.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MEMO_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = std::env::var("MEMO_LLM_API_KEY")
            .ok()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("MEMO_BOT_TOKEN") {
            self.notifier.bot_token = val;
        }
        if let Ok(val) = std::env::var("MEMO_SEARCH_API_KEY") {
            self.search.api_key = val;
        }
        if self.embedding.api_key.is_empty() {
            self.embedding.api_key = self.llm.api_key.clone();
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MemoConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.llm.max_history_turns, 20);
        assert_eq!(config.scheduler.interval_secs, 5);
        assert!(config.storage.db_path.ends_with("memogenius.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[embedding]
provider = "hashed"
dimensions = 256

[scheduler]
interval_secs = 30
"#;
        let config: MemoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.embedding.dimensions, 256);
        assert_eq!(config.scheduler.interval_secs, 30);
        // defaults still apply for unset fields
        assert_eq!(config.server.port, 8000);
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MemoConfig::default();
        std::env::set_var("MEMO_DB", "/tmp/override.db");
        std::env::set_var("MEMO_LOG_LEVEL", "trace");
        std::env::set_var("MEMO_LLM_API_KEY", "llm-key");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.llm.api_key, "llm-key");
        // embedding key inherits the LLM key when unset
        assert_eq!(config.embedding.api_key, "llm-key");

        // Clean up
        std::env::remove_var("MEMO_DB");
        std::env::remove_var("MEMO_LOG_LEVEL");
        std::env::remove_var("MEMO_LLM_API_KEY");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/data.db"), PathBuf::from("/var/data.db"));
    }
}
