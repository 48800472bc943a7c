//! Harvests email attachments from a Gmail mailbox into a local directory.

pub mod auth;
pub mod config;
pub mod error;
pub mod harvest;
pub mod provider;
pub mod secrets;
pub mod storage;

pub use auth::CredentialProvider;
pub use config::{load_config, Config};
pub use error::{ConfigError, HarvestError, PersistError, Result, StorageError};
pub use harvest::{
    AttachmentDescriptor, HarvestReport, Harvester, ProgressEvent, ProgressReporter,
    SelectionCriterion,
};
pub use provider::{GmailClient, MailProvider, ProviderError};
pub use secrets::{SecretError, SecretSources};
