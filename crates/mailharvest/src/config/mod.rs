pub mod loader;
pub mod schema;

pub use loader::{default_config_path, load_config, load_config_from_str, load_optional_config};
pub use schema::{
    AuthSettings, Config, FetchSettings, PacingConfig, PageSizes, PersistSettings,
    ProviderSettings, DEFAULT_TOKEN_URL,
};
