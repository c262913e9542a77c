//! Configuration loading, validation, and management for DeepContext.
//!
//! Loads configuration from `~/.deepcontext/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use deepcontext_core::agent::{AgentConfig, DEFAULT_MAX_TURNS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// System prompt used when the config does not override it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are DeepContext, an autonomous knowledge assistant working on the user's local Markdown notes.

You have tools to list notes in a directory, read a note, store knowledge triplets \
(source_entity, relation, target_entity, source_file) in a local knowledge graph, and \
query that graph with read-only SQL.

When asked to learn from notes: list them, read each relevant one, extract the core \
concepts and their relations, and store every fact with add_triplet, citing the note \
it came from.

When asked a question: query the table knowledge_triplets(id, source_entity, relation, \
target_entity, source_file, created_at) with SELECT statements only, then answer from \
the rows you found. If a tool reports an error, correct your call and try again.

When the task is complete, reply with a concise summary and no further tool calls.";

/// Query used when none is given on the command line.
pub const DEFAULT_QUERY: &str = "List the Markdown notes in '.', read them, extract the key \
knowledge triplets into the knowledge graph, then summarize what you stored.";

/// The root configuration structure.
///
/// Maps directly to `~/.deepcontext/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per oracle response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSection,

    /// Knowledge store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Note access settings
    #[serde(default)]
    pub notes: NotesConfig,

    /// How the agent launches the tool server
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("store", &self.store)
            .field("notes", &self.notes)
            .field("server", &self.server)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Oracle calls allowed per run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Replaces the built-in system prompt; empty string disables it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// First user turn when no query is given
    #[serde(default = "default_query")]
    pub default_query: String,

    /// Per tool call timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_timeout_secs: Option<u64>,
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}
fn default_query() -> String {
    DEFAULT_QUERY.into()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            system_prompt: None,
            default_query: default_query(),
            tool_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "deepcontext_graph.db".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Confine note tools to this directory. Unset = no confinement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Executable to spawn. Unset = the running `deepcontext` binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments for `command`. Unset = `["serve"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.deepcontext/config.toml).
    ///
    /// Environment variables override the file:
    /// - `DEEPCONTEXT_API_KEY`, then `DEEPSEEK_API_KEY`, then `OPENAI_API_KEY`
    /// - `DEEPCONTEXT_BASE_URL`, `DEEPCONTEXT_MODEL`
    /// - `DEEPCONTEXT_MAX_TURNS`, `DEEPCONTEXT_DB_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("DEEPCONTEXT_API_KEY")
                .or_else(|| lookup("DEEPSEEK_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(url) = lookup("DEEPCONTEXT_BASE_URL") {
            self.base_url = url;
        }

        if let Some(model) = lookup("DEEPCONTEXT_MODEL") {
            self.model = model;
        }

        if let Some(raw) = lookup("DEEPCONTEXT_MAX_TURNS") {
            self.agent.max_turns = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("DEEPCONTEXT_MAX_TURNS is not a number: {raw}"))
            })?;
        }

        if let Some(path) = lookup("DEEPCONTEXT_DB_PATH") {
            self.store.db_path = path;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".deepcontext")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be greater than 0".into(),
            ));
        }

        if self.store.db_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.db_path must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The system prompt for a run. An empty override disables it.
    pub fn system_prompt(&self) -> Option<String> {
        match &self.agent.system_prompt {
            Some(p) if p.trim().is_empty() => None,
            Some(p) => Some(p.clone()),
            None => Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Directory the note tools are confined to, if any.
    pub fn notes_root(&self) -> Option<PathBuf> {
        self.notes
            .root
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Build the explicit per-run configuration handed to the agent loop.
    pub fn to_agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_turns: self.agent.max_turns,
            system_prompt: self.system_prompt(),
            tool_timeout_secs: self.agent.tool_timeout_secs,
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: AgentSection::default(),
            store: StoreConfig::default(),
            notes: NotesConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn notes_root_ignores_blank() {
        let mut config = AppConfig::default();
        assert!(config.notes_root().is_none());
        config.notes.root = Some("  ".into());
        assert!(config.notes_root().is_none());
        config.notes.root = Some("/srv/notes".into());
        assert_eq!(config.notes_root(), Some(PathBuf::from("/srv/notes")));
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.agent.max_turns, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.agent.max_turns, config.agent.max_turns);
        assert_eq!(parsed.store.db_path, config.store.db_path);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_turns_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_turns = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.base_url, "https://api.deepseek.com");
    }

    #[test]
    fn load_from_file_with_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "deepseek-reasoner"

[agent]
max_turns = 5
system_prompt = "Only answer in French."

[store]
db_path = "/tmp/graph.db"

[notes]
root = "/home/me/notes"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.store.db_path, "/tmp/graph.db");
        assert_eq!(config.notes.root.as_deref(), Some("/home/me/notes"));
        assert_eq!(config.system_prompt().as_deref(), Some("Only answer in French."));
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [unclosed").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("DEEPSEEK_API_KEY", "sk-deepseek"),
                ("OPENAI_API_KEY", "sk-openai"),
                ("DEEPCONTEXT_MODEL", "custom-model"),
                ("DEEPCONTEXT_MAX_TURNS", "7"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-deepseek"));
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.agent.max_turns, 7);
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config
            .apply_env_overrides(env(&[("DEEPCONTEXT_API_KEY", "from-env")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn bad_max_turns_env_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_env_overrides(env(&[("DEEPCONTEXT_MAX_TURNS", "lots")]))
            .is_err());
        assert!(config
            .apply_env_overrides(env(&[("DEEPCONTEXT_MAX_TURNS", "0")]))
            .is_err());
    }

    #[test]
    fn empty_system_prompt_disables_it() {
        let mut config = AppConfig::default();
        assert!(config.system_prompt().is_some());
        config.agent.system_prompt = Some("  ".into());
        assert!(config.system_prompt().is_none());
    }

    #[test]
    fn agent_config_mirrors_settings() {
        let mut config = AppConfig::default();
        config.agent.max_turns = 3;
        config.agent.tool_timeout_secs = Some(30);
        let agent = config.to_agent_config();
        assert_eq!(agent.max_turns, 3);
        assert_eq!(agent.model, "deepseek-chat");
        assert_eq!(agent.tool_timeout_secs, Some(30));
        assert!(agent.system_prompt.unwrap().contains("knowledge_triplets"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("deepseek-chat"));
        assert!(toml_str.contains("max_turns = 20"));
    }
}
