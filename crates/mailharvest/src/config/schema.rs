use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::harvest::{DEFAULT_FETCH_BATCH_SIZE, DEFAULT_PERSIST_BATCH_SIZE};

/// Top-level configuration. Every field has a default, so an empty object is a
/// valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directory attachments are written into.
    pub output_directory: PathBuf,
    /// Log level used when neither `-v` nor `RUST_LOG` is given.
    pub log_level: String,
    pub auth: AuthSettings,
    pub provider: ProviderSettings,
    pub page_sizes: PageSizes,
    pub fetch: FetchSettings,
    pub persist: PersistSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("files"),
            log_level: "warn".to_string(),
            auth: AuthSettings::default(),
            provider: ProviderSettings::default(),
            page_sizes: PageSizes::default(),
            fetch: FetchSettings::default(),
            persist: PersistSettings::default(),
        }
    }
}

/// Where the access credential comes from.
///
/// A directly configured access token (value, file or env var) wins. Otherwise
/// the stored token file is used, refreshed through the token endpoint when it
/// carries a refresh token and client credentials are available.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token_insecure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_env_var: Option<String>,
    /// Token file written by the authorization step.
    pub token_file: PathBuf,
    /// OAuth client credentials (`installed.client_id` / `installed.client_secret`).
    pub credentials_file: PathBuf,
    pub token_url: String,
}

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_insecure: None,
            access_token_file: None,
            access_token_env_var: Some("GMAIL_ACCESS_TOKEN".to_string()),
            token_file: PathBuf::from("token.json"),
            credentials_file: PathBuf::from("credentials.json"),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub user_id: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            user_id: "me".to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 60,
        }
    }
}

/// `maxResults` per list call for each selection criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSizes {
    pub label: u32,
    pub sender: u32,
    pub all: u32,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            label: 200,
            sender: 50,
            all: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    pub batch_size: usize,
    pub pacing: PacingConfig,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_FETCH_BATCH_SIZE,
            pacing: PacingConfig::Fixed { delay_ms: 3000 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistSettings {
    pub batch_size: usize,
    pub pacing: PacingConfig,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_PERSIST_BATCH_SIZE,
            pacing: PacingConfig::None,
        }
    }
}

/// How batches are spaced out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PacingConfig {
    None,
    Fixed {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    TokenBucket {
        capacity: u32,
        #[serde(rename = "refillPerSec")]
        refill_per_sec: f64,
    },
}
