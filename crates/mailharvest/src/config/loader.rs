use std::path::{Path, PathBuf};

use crate::config::schema::{Config, PacingConfig, PageSizes};
use crate::error::ConfigError;

/// Upper bound the provider accepts for `maxResults`.
const MAX_PAGE_SIZE: u32 = 500;

/// `<config_dir>/mailharvest/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mailharvest").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads `path` if it exists, falling back to the built-in defaults.
pub fn load_optional_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_page_sizes(&config.page_sizes)?;

    if config.fetch.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "fetch.batchSize must be at least 1".to_string(),
        });
    }
    if config.persist.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "persist.batchSize must be at least 1".to_string(),
        });
    }

    validate_pacing(&config.fetch.pacing, "fetch.pacing")?;
    validate_pacing(&config.persist.pacing, "persist.pacing")?;

    if config.output_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "outputDirectory must not be empty".to_string(),
        });
    }

    Ok(())
}

fn validate_page_sizes(sizes: &PageSizes) -> Result<(), ConfigError> {
    for (name, size) in [
        ("label", sizes.label),
        ("sender", sizes.sender),
        ("all", sizes.all),
    ] {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation {
                message: format!(
                    "pageSizes.{} must be between 1 and {}, got {}",
                    name, MAX_PAGE_SIZE, size
                ),
            });
        }
    }
    Ok(())
}

fn validate_pacing(pacing: &PacingConfig, field: &str) -> Result<(), ConfigError> {
    match pacing {
        PacingConfig::None | PacingConfig::Fixed { .. } => Ok(()),
        PacingConfig::TokenBucket {
            capacity,
            refill_per_sec,
        } => {
            if *capacity == 0 {
                return Err(ConfigError::Validation {
                    message: format!("{}.capacity must be at least 1", field),
                });
            }
            if !refill_per_sec.is_finite() || *refill_per_sec <= 0.0 {
                return Err(ConfigError::Validation {
                    message: format!("{}.refillPerSec must be positive", field),
                });
            }
            Ok(())
        }
    }
}
