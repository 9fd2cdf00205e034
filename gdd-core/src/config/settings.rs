//! Settings loaded from TOML files.
//!
//! Non-sensitive configuration lives in the XDG config directory
//! (`~/.config/gdd-forge/config.toml`). The directory can be overridden with
//! `GDD_CONFIG_DIR`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::provider::ProviderType;

/// Ordered list of model ids for the default chain.
///
/// Accepts either a single string (`"claude-sonnet-4"`) or a list
/// (`["claude-sonnet-4", "gpt-4o"]`). Serializes back as a string when it
/// holds exactly one id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAliases(Vec<String>);

impl ModelAliases {
    pub fn single(alias: impl Into<String>) -> Self {
        Self(vec![alias.into()])
    }

    pub fn many(aliases: Vec<String>) -> Self {
        Self(aliases)
    }

    /// The highest-priority id.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'de> Deserialize<'de> for ModelAliases {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ModelAliasesVisitor;

        impl<'de> Visitor<'de> for ModelAliasesVisitor {
            type Value = ModelAliases;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a model id or a list of model ids")
            }

            fn visit_str<E>(self, value: &str) -> Result<ModelAliases, E>
            where
                E: de::Error,
            {
                let value = value.trim();
                if value.is_empty() {
                    Ok(ModelAliases(Vec::new()))
                } else {
                    Ok(ModelAliases(vec![value.to_string()]))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<ModelAliases, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut aliases = Vec::new();
                while let Some(alias) = seq.next_element::<String>()? {
                    let alias = alias.trim();
                    if !alias.is_empty() {
                        aliases.push(alias.to_string());
                    }
                }
                Ok(ModelAliases(aliases))
            }
        }

        deserializer.deserialize_any(ModelAliasesVisitor)
    }
}

impl Serialize for ModelAliases {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0.len() == 1 {
            serializer.serialize_str(&self.0[0])
        } else {
            self.0.serialize(serializer)
        }
    }
}

/// Written to disk the first time settings are loaded.
const DEFAULT_CONFIG_TOML: &str = r#"# gdd-forge configuration file
# Located at: ~/.config/gdd-forge/config.toml (override the directory with GDD_CONFIG_DIR)
#
# Secrets are never stored here. API keys come from environment variables:
#   - ANTHROPIC_API_KEY
#   - OPENAI_API_KEY
#   - GOOGLE_GENERATIVE_AI_API_KEY (or GEMINI_API_KEY)
#   - XAI_API_KEY
#   - GROQ_API_KEY

# Model used when a request does not name one. A list forms a fallback chain.
# default_model = "claude-sonnet-4"
# default_model = ["claude-sonnet-4", "gpt-4o"]

[models]
# Extra models, merged into the built-in catalog:
# [models.local-llama]
# provider = "openai"
# model = "llama3.1:8b"
# name = "Local Llama"
# base_url = "http://127.0.0.1:11434/v1"

[gateway]
host = "127.0.0.1"
port = 3000
# base_url = "http://127.0.0.1:3000"  # Computed from host:port if not set
# cors_allowed_origins = ["http://localhost:5173"]

[logging]
level = "info"
# dump_queries = true

[generation]
max_tokens = 1000
temperature = 0.7
min_enhance_chars = 10
min_filled_subsections = 1
context_chars_per_field = 1500
request_timeout_seconds = 120

[editor]
autosave_seconds = 30
auto_save_on_accept = false
user_id = "local-editor"

[database]
# path = "/var/lib/gdd-forge/gdd.sqlite3"
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Custom models keyed by id, merged into the built-in catalog
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,

    /// Default model id or fallback chain.
    ///
    /// Empty means the built-in default.
    #[serde(default)]
    pub default_model: ModelAliases,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

/// Custom model entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Provider type (e.g. "anthropic", "openai", "google", "xai", "groq")
    #[serde(
        deserialize_with = "deserialize_model_provider",
        serialize_with = "serialize_model_provider"
    )]
    pub provider: ProviderType,
    /// Model identifier sent to the provider
    pub model: String,
    /// Display name; the id is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// URL clients use to reach the gateway (computed from host/port if null)
    pub base_url: Option<String>,

    /// Browser origins allowed to call the API; `["*"]` allows any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Dump raw LLM request JSON to ./logs/queries/
    #[serde(default)]
    pub dump_queries: bool,
}

/// Bounds applied to every AI request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationSettings {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Shortest text (trimmed, in characters) accepted for enhancement
    #[serde(default = "default_min_enhance_chars")]
    pub min_enhance_chars: usize,

    /// Filled subsections required before generation is allowed
    #[serde(default = "default_min_filled_subsections")]
    pub min_filled_subsections: usize,

    /// Plain-text budget per subsection quoted as context
    #[serde(default = "default_context_chars_per_field")]
    pub context_chars_per_field: usize,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

/// Editing session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorSettings {
    /// Debounce window between the last edit and the autosave
    #[serde(default = "default_autosave_seconds")]
    pub autosave_seconds: u64,

    /// Save immediately after accepting an AI draft
    #[serde(default)]
    pub auto_save_on_accept: bool,

    /// Recorded as the last editor of saved sections
    #[serde(default = "default_editor_user_id")]
    pub user_id: String,
}

/// Database settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// SQLite file path; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

// Default value functions

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_min_enhance_chars() -> usize {
    10
}

fn default_min_filled_subsections() -> usize {
    1
}

fn default_context_chars_per_field() -> usize {
    1500
}

fn default_request_timeout_seconds() -> u64 {
    120
}

fn default_autosave_seconds() -> u64 {
    30
}

fn default_editor_user_id() -> String {
    "local-editor".to_string()
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            base_url: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dump_queries: false,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            min_enhance_chars: default_min_enhance_chars(),
            min_filled_subsections: default_min_filled_subsections(),
            context_chars_per_field: default_context_chars_per_field(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_seconds: default_autosave_seconds(),
            auto_save_on_accept: false,
            user_id: default_editor_user_id(),
        }
    }
}

fn deserialize_model_provider<'de, D>(deserializer: D) -> Result<ProviderType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse().map_err(serde::de::Error::custom)
}

fn serialize_model_provider<S>(provider: &ProviderType, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(provider.as_str())
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Data directory not found")]
    DataDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file, creating it with
    /// defaults when missing.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configuration file path: `$GDD_CONFIG_DIR/config.toml` or
    /// `~/.config/gdd-forge/config.toml`.
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var("GDD_CONFIG_DIR") {
            return Ok(PathBuf::from(override_dir).join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("gdd-forge");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// HTTP bind address of the gateway.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    /// URL clients use to reach the gateway.
    pub fn gateway_url(&self) -> String {
        self.gateway
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", self.gateway.host, self.gateway.port))
    }

    /// SQLite file path, falling back to `<data dir>/gdd-forge/gdd.sqlite3`.
    pub fn database_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = self.database.path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let data_dir = dirs::data_dir()
            .ok_or(SettingsError::DataDirNotFound)?
            .join("gdd-forge");
        Ok(data_dir.join("gdd.sqlite3"))
    }
}
