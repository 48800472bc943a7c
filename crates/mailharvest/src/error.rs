use std::path::PathBuf;
use thiserror::Error;

use crate::provider::ProviderError;

/// Stage-level failures. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Label \"{0}\" not found")]
    LabelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(#[source] ProviderError),
}

impl From<ProviderError> for HarvestError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthorized(msg) => HarvestError::Auth(msg),
            other => HarvestError::Provider(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

/// Why a single attachment could not be saved.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("Attachment response carried no data")]
    MissingData,

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
