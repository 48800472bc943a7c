//! Access credential acquisition.
//!
//! The interactive authorization-code flow lives outside this crate. Here we
//! only pick up a credential it already produced: a directly configured access
//! token, or the stored token file, refreshed through the token endpoint when
//! it has expired.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::error::{HarvestError, Result};
use crate::secrets::{expand_home, SecretSources};

/// Stored tokens are refreshed this long before they actually expire.
const EXPIRY_SKEW_MS: i64 = 60_000;

const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Token file as written by the authorization step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl StoredToken {
    fn is_fresh(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry - EXPIRY_SKEW_MS > now_ms,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientCredentialsFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

#[derive(Debug, Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Produces the bearer token handed to the provider client.
pub struct CredentialProvider {
    settings: AuthSettings,
    client: Client,
}

impl CredentialProvider {
    pub fn new(settings: AuthSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HarvestError::Auth(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }

    pub async fn access_token(&self) -> Result<SecretString> {
        let direct = SecretSources {
            direct: self.settings.access_token_insecure.as_deref(),
            file: self.settings.access_token_file.as_deref(),
            env_var: self.settings.access_token_env_var.as_deref(),
        };
        if self.settings.access_token_insecure.is_some() {
            warn!("Using a direct access token value from the config file is not recommended");
        }
        if let Some(token) = direct
            .resolve_optional()
            .map_err(|e| HarvestError::Auth(e.to_string()))?
        {
            debug!("Using configured access token");
            return Ok(token);
        }

        let token_path = expand_path(&self.settings.token_file);
        let stored = read_stored_token(&token_path)?;
        let now_ms = Utc::now().timestamp_millis();

        if let Some(access_token) = stored.access_token.as_deref().filter(|_| stored.is_fresh(now_ms)) {
            debug!("Using stored access token from {}", token_path);
            return Ok(SecretString::from(access_token.to_string()));
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            return Err(HarvestError::Auth(format!(
                "Stored access token in {} has expired and no refresh token is available; \
                 re-run the authorization step",
                token_path
            )));
        };

        let credentials = read_client_credentials(&expand_path(&self.settings.credentials_file))?;
        let response = self
            .refresh(&SecretString::from(refresh_token), &credentials)
            .await?;

        let refreshed = StoredToken {
            access_token: Some(response.access_token.clone()),
            refresh_token: stored.refresh_token,
            scope: response.scope.or(stored.scope),
            token_type: response.token_type.or(stored.token_type),
            expiry_date: response.expires_in.map(|secs| now_ms + secs * 1000),
        };
        if let Err(e) = write_stored_token(&token_path, &refreshed) {
            warn!("Could not update token file {}: {}", token_path, e);
        }

        Ok(SecretString::from(response.access_token))
    }

    async fn refresh(
        &self,
        refresh_token: &SecretString,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse> {
        info!("Refreshing access token");

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| HarvestError::Auth(format!("Token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            return Err(HarvestError::Auth(format!(
                "Token refresh failed ({}): {}",
                status, body
            )));
        }

        let token = response.json::<TokenResponse>().await.map_err(|e| {
            HarvestError::Auth(format!("Failed to parse refresh response: {}", e))
        })?;

        info!("Successfully refreshed access token");
        Ok(token)
    }
}

fn expand_path(path: &Path) -> String {
    expand_home(&path.to_string_lossy())
}

fn read_stored_token(path: &str) -> Result<StoredToken> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HarvestError::Auth(format!(
            "No access token configured and token file {} could not be read ({}); \
             set GMAIL_ACCESS_TOKEN or run the authorization step",
            path, e
        ))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| HarvestError::Auth(format!("Invalid token file {}: {}", path, e)))
}

fn write_stored_token(path: &str, token: &StoredToken) -> std::io::Result<()> {
    let json = serde_json::to_string(token)?;
    std::fs::write(path, json)
}

fn read_client_credentials(path: &str) -> Result<ClientCredentials> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HarvestError::Auth(format!(
            "Cannot refresh token: client credentials file {} could not be read ({})",
            path, e
        ))
    })?;
    let file: ClientCredentialsFile = serde_json::from_str(&content)
        .map_err(|e| HarvestError::Auth(format!("Invalid credentials file {}: {}", path, e)))?;
    file.installed.or(file.web).ok_or_else(|| {
        HarvestError::Auth(format!(
            "Credentials file {} has neither an 'installed' nor a 'web' client",
            path
        ))
    })
}
