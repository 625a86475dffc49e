pub mod app_identity;
pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_config, load_default_config, save_config};
pub use schema::{
    AgentConfig, AppConfig, BlobConfig, ModelsConfig, ProviderConfig, RuntimeConfig,
    SandboxConfig, SandboxMode, SecurityConfig, SuggestionsSettings, TitleGenSettings,
    WelcomeConfig,
};
