//! Gmail REST client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ProviderSettings;

use super::types::{AttachmentBody, Label, ListLabelsResponse, ListMessagesResponse, Message};
use super::{ListQuery, MailProvider, ProviderError};

/// Maximum length of an error body kept in a [`ProviderError`].
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Bearer-authenticated client for `gmail/v1/users/{userId}`.
pub struct GmailClient {
    client: Client,
    base_url: String,
    user_id: String,
    access_token: SecretString,
}

impl GmailClient {
    pub fn new(settings: &ProviderSettings, access_token: SecretString) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_id: settings.user_id.clone(),
            access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, self.user_id, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Error reasons Gmail reports with a 403 that are not credential problems.
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

fn is_rate_limited(body: &str) -> bool {
    serde_json::from_str::<ErrorEnvelope>(body).is_ok_and(|envelope| {
        envelope
            .error
            .errors
            .iter()
            .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()))
    })
}

/// 401 is always a credential failure. 403 is one unless Gmail names a rate
/// limit as the reason.
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let unauthorized = match status {
        StatusCode::UNAUTHORIZED => true,
        StatusCode::FORBIDDEN => !is_rate_limited(body),
        _ => false,
    };
    let body = truncate_body(body);
    if unauthorized {
        ProviderError::Unauthorized(format!("{}: {}", status, body))
    } else {
        ProviderError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_labels(&self) -> Result<Vec<Label>, ProviderError> {
        debug!("Listing labels");
        let response: ListLabelsResponse = self
            .send_json(self.client.get(self.url("labels")))
            .await?;
        Ok(response.labels)
    }

    async fn list_messages(
        &self,
        query: &ListQuery,
    ) -> Result<ListMessagesResponse, ProviderError> {
        let mut params: Vec<(&str, String)> = vec![("maxResults", query.max_results.to_string())];
        for label_id in &query.label_ids {
            params.push(("labelIds", label_id.clone()));
        }
        if let Some(q) = &query.query {
            params.push(("q", q.clone()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }

        debug!(
            "Listing messages (maxResults={}, continued={})",
            query.max_results,
            query.page_token.is_some()
        );
        self.send_json(self.client.get(self.url("messages")).query(&params))
            .await
    }

    async fn get_message(&self, id: &str) -> Result<Message, ProviderError> {
        self.send_json(self.client.get(self.url(&format!("messages/{}", id))))
            .await
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, ProviderError> {
        let path = format!("messages/{}/attachments/{}", message_id, attachment_id);
        self.send_json(self.client.get(self.url(&path))).await
    }
}
