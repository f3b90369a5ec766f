// Configuration management module
// TOML settings on disk plus provider credentials from the environment

pub mod credentials;
pub mod settings;


pub use credentials::Credentials;
pub use settings::{
    Config, ConfigError, EmbeddingConfig, GenerationConfig, IndexConfig, IndexProvider,
    IngestionConfig, Metric,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
