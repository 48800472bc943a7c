//! Mail provider boundary.
//!
//! The harvester only talks to the mailbox through [`MailProvider`]. The
//! production implementation is [`GmailClient`]; tests substitute an in-memory
//! provider.

pub mod gmail;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use gmail::GmailClient;
pub use types::{
    AttachmentBody, Label, ListLabelsResponse, ListMessagesResponse, Message, MessagePart,
    MessagePartBody, MessageRef,
};

/// Errors raised by a provider call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The credential was rejected (HTTP 401, or a 403 that is not a rate limit).
    #[error("Credential rejected by provider: {0}")]
    Unauthorized(String),

    /// Any other non-success status.
    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape.
    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

/// Parameters of one `messages.list` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub label_ids: Vec<String>,
    pub query: Option<String>,
    pub max_results: u32,
    pub page_token: Option<String>,
}

impl ListQuery {
    pub fn with_page_token(&self, token: Option<String>) -> Self {
        Self {
            page_token: token,
            ..self.clone()
        }
    }
}

/// An authenticated handle on a mailbox.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn list_labels(&self) -> Result<Vec<Label>, ProviderError>;

    async fn list_messages(&self, query: &ListQuery)
        -> Result<ListMessagesResponse, ProviderError>;

    async fn get_message(&self, id: &str) -> Result<Message, ProviderError>;

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, ProviderError>;
}

#[async_trait]
impl<T: MailProvider + ?Sized> MailProvider for std::sync::Arc<T> {
    async fn list_labels(&self) -> Result<Vec<Label>, ProviderError> {
        (**self).list_labels().await
    }

    async fn list_messages(
        &self,
        query: &ListQuery,
    ) -> Result<ListMessagesResponse, ProviderError> {
        (**self).list_messages(query).await
    }

    async fn get_message(&self, id: &str) -> Result<Message, ProviderError> {
        (**self).get_message(id).await
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, ProviderError> {
        (**self).get_attachment(message_id, attachment_id).await
    }
}
