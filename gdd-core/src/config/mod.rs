//! Configuration management for gdd-forge.
//!
//! Secrets (API keys) come from environment variables. Settings come from a
//! TOML file.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `ANTHROPIC_API_KEY`
//! - `OPENAI_API_KEY`
//! - `GOOGLE_GENERATIVE_AI_API_KEY` (or `GEMINI_API_KEY`)
//! - `XAI_API_KEY`
//! - `GROQ_API_KEY`
//!
//! ## Settings (TOML File)
//! Located at `~/.config/gdd-forge/config.toml`:
//! ```toml
//! default_model = "claude-sonnet-4"
//!
//! [gateway]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [generation]
//! max_tokens = 1000
//! temperature = 0.7
//!
//! [editor]
//! autosave_seconds = 30
//! ```

mod secrets;
mod settings;

use crate::models::{DEFAULT_MODEL_ID, ModelSpec, builtin_catalog};
use crate::provider::ProviderType;

pub use secrets::{Secrets, SecretsError};
pub use settings::{
    DatabaseSettings, EditorSettings, GatewaySettings, GenerationSettings, LoggingSettings,
    ModelAliases, ModelConfig, Settings, SettingsError,
};

/// Combined configuration containing both secrets and settings.
///
/// Built once at startup and passed to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub secrets: Secrets,
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Default model '{0}' is neither built in nor configured under [models]")]
    DefaultModelNotFound(String),

    #[error("Model '{0}' sets base_url but its provider does not accept one")]
    BaseUrlNotSupported(String),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

impl Config {
    /// Load configuration from the environment and the settings file.
    ///
    /// Missing API keys never fail loading. Inconsistent settings do.
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env();
        let settings = Settings::load()?;
        let config = Self { secrets, settings };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency of the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let specs = self.model_specs();
        for alias in self.settings.default_model.iter() {
            if !specs.iter().any(|spec| spec.id == alias) {
                return Err(ConfigError::DefaultModelNotFound(alias.to_string()));
            }
        }

        for (id, model) in &self.settings.models {
            if model.base_url.is_some() && !model.provider.is_openai_compatible() {
                return Err(ConfigError::BaseUrlNotSupported(id.clone()));
            }
        }

        let generation = &self.settings.generation;
        if generation.max_tokens == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "generation.max_tokens",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::InvalidSetting {
                key: "generation.temperature",
                reason: format!("{} is outside 0.0..=2.0", generation.temperature),
            });
        }
        if self.settings.editor.autosave_seconds == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "editor.autosave_seconds",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Built-in catalog followed by custom `[models.*]` entries.
    ///
    /// A custom entry with a built-in id replaces the built-in in place.
    pub fn model_specs(&self) -> Vec<ModelSpec> {
        let mut specs = builtin_catalog();
        for (id, model) in &self.settings.models {
            let spec = ModelSpec {
                id: id.clone(),
                name: model.name.clone().unwrap_or_else(|| id.clone()),
                provider: model.provider,
                api_model: model.model.clone(),
                description: model.description.clone().unwrap_or_default(),
                base_url: model.base_url.clone(),
            };
            match specs.iter_mut().find(|existing| existing.id == *id) {
                Some(existing) => *existing = spec,
                None => specs.push(spec),
            }
        }
        specs
    }

    /// Model ids tried, in order, when a request names none.
    pub fn default_model_chain(&self) -> Vec<String> {
        if self.settings.default_model.is_empty() {
            vec![DEFAULT_MODEL_ID.to_string()]
        } else {
            self.settings.default_model.clone().into_vec()
        }
    }

    pub fn has_provider(&self, provider: ProviderType) -> bool {
        self.secrets.has_provider(provider)
    }

    pub fn api_key(&self, provider: ProviderType) -> Option<&str> {
        self.secrets.api_key(provider)
    }

    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }

    pub fn gateway_url(&self) -> String {
        self.settings.gateway_url()
    }
}

/// Load .env file if it exists (for development convenience).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::secrets::tests::{ENV_MUTEX, clear_env};
    use super::*;
    use std::env;

    fn custom(provider: ProviderType, model: &str) -> ModelConfig {
        ModelConfig {
            provider,
            model: model.to_string(),
            name: None,
            description: None,
            base_url: None,
        }
    }

    #[test]
    fn test_default_chain_falls_back_to_builtin() {
        let config = Config::default();
        assert_eq!(config.default_model_chain(), vec![DEFAULT_MODEL_ID.to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_default_model_rejected() {
        let mut config = Config::default();
        config.settings.default_model = ModelAliases::single("does-not-exist");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DefaultModelNotFound(alias)) if alias == "does-not-exist"
        ));
    }

    #[test]
    fn test_custom_models_are_merged() {
        let mut config = Config::default();
        config
            .settings
            .models
            .insert("local".to_string(), custom(ProviderType::OpenAi, "llama3"));
        config.settings.models.insert(
            "gpt-4o".to_string(),
            custom(ProviderType::OpenAi, "gpt-4o-2024-11-20"),
        );
        config.settings.default_model = ModelAliases::single("local");

        let specs = config.model_specs();
        assert_eq!(specs.last().unwrap().id, "local");
        assert_eq!(specs.last().unwrap().name, "local");
        let gpt = specs.iter().find(|s| s.id == "gpt-4o").unwrap();
        assert_eq!(gpt.api_model, "gpt-4o-2024-11-20");
        assert_eq!(
            specs.iter().filter(|s| s.id == "gpt-4o").count(),
            1,
            "override replaces in place"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_only_for_openai_compatible() {
        let mut config = Config::default();
        let mut model = custom(ProviderType::Anthropic, "claude-x");
        model.base_url = Some("http://proxy".to_string());
        config.settings.models.insert("proxied".to_string(), model);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BaseUrlNotSupported(_))
        ));
    }

    #[test]
    fn test_invalid_generation_bounds() {
        let mut config = Config::default();
        config.settings.generation.temperature = 3.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { key: "generation.temperature", .. })
        ));
    }

    #[test]
    fn test_provider_availability_follows_secrets() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { env::set_var("GROQ_API_KEY", "gsk-test") }

        let config = Config {
            secrets: Secrets::from_env_inner(),
            settings: Settings::default(),
        };
        assert!(config.has_provider(ProviderType::Groq));
        assert!(!config.has_provider(ProviderType::Anthropic));
        assert_eq!(config.api_key(ProviderType::Groq), Some("gsk-test"));
        clear_env();
    }

    #[test]
    fn test_config_path_uses_env_override() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().to_string_lossy().to_string();

        // SAFETY: test-scoped env mutation.
        unsafe { env::set_var("GDD_CONFIG_DIR", &value) };
        let path = Settings::config_path().unwrap();
        let loaded = Settings::load().unwrap();
        // SAFETY: test-scoped env mutation cleanup.
        unsafe { env::remove_var("GDD_CONFIG_DIR") };

        assert_eq!(path, dir.path().join("config.toml"));
        assert!(path.exists(), "default file is written on first load");
        assert_eq!(loaded.generation.max_tokens, 1000);
    }
}
