pub mod catalog;
pub mod config;
pub mod game;
pub mod message;
pub mod models;
pub mod provider;
pub mod text;

// Config re-exports
pub use config::{
    Config, ConfigError, DatabaseSettings, EditorSettings, GatewaySettings, GenerationSettings,
    LoggingSettings, ModelAliases, ModelConfig, Secrets, SecretsError, Settings, SettingsError,
    load_dotenv,
};

pub use catalog::{SECTIONS, SectionDefinition, SubSectionDefinition, find_section, resolve_sub_section};
pub use game::{AllSectionsContent, GameContext, SectionContent, count_filled_sub_sections};
pub use message::{
    EnhanceRequest, EnhancementAction, ErrorBody, GenerateRequest, HealthResponse,
    SaveSectionRequest, SaveSectionResponse, SectionPayload,
};
pub use models::{DEFAULT_MODEL_ID, MODEL_CATALOG, ModelOption, ModelSpec, builtin_catalog};
pub use provider::ProviderType;
