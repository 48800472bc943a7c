//! In-memory mailbox implementing `MailProvider`.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mailharvest::provider::{
    AttachmentBody, Label, ListMessagesResponse, ListQuery, MailProvider, Message, MessageRef,
    ProviderError,
};

use super::builders::url_safe;

/// Tracks how many calls of one kind are in flight at once.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Messages are listed in insertion order and paged by `maxResults`.
/// Label filters match on `Message::label_ids`; `from:` queries match on the
/// sender registered with `add_from`.
#[derive(Default)]
pub struct FakeMailbox {
    labels: Vec<Label>,
    order: Vec<String>,
    messages: HashMap<String, Message>,
    senders: HashMap<String, String>,
    attachments: HashMap<(String, String), AttachmentBody>,
    failing_messages: HashSet<String>,
    failing_attachments: HashSet<String>,
    unauthorized: bool,
    latency: Duration,

    pub list_calls: AtomicUsize,
    pub message_calls: InFlight,
    pub attachment_calls: InFlight,
    pub queries: Mutex<Vec<ListQuery>>,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, id: &str, name: &str) -> Self {
        self.labels.push(Label {
            id: id.to_string(),
            name: name.to_string(),
            label_type: Some("user".to_string()),
        });
        self
    }

    pub fn add(mut self, message: Message) -> Self {
        self.order.push(message.id.clone());
        self.messages.insert(message.id.clone(), message);
        self
    }

    pub fn add_from(mut self, sender: &str, message: Message) -> Self {
        self.senders.insert(message.id.clone(), sender.to_string());
        self.add(message)
    }

    pub fn with_attachment(mut self, message_id: &str, attachment_id: &str, bytes: &[u8]) -> Self {
        self.attachments.insert(
            (message_id.to_string(), attachment_id.to_string()),
            AttachmentBody {
                size: bytes.len() as u64,
                data: Some(url_safe(bytes)),
            },
        );
        self
    }

    pub fn with_raw_attachment(mut self, message_id: &str, attachment_id: &str, body: AttachmentBody) -> Self {
        self.attachments
            .insert((message_id.to_string(), attachment_id.to_string()), body);
        self
    }

    pub fn failing_message(mut self, id: &str) -> Self {
        self.failing_messages.insert(id.to_string());
        self
    }

    pub fn failing_attachment(mut self, attachment_id: &str) -> Self {
        self.failing_attachments.insert(attachment_id.to_string());
        self
    }

    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    /// Every get call sleeps this long, so concurrent calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn matches(&self, id: &str, query: &ListQuery) -> bool {
        let message = &self.messages[id];
        let label_ok = query
            .label_ids
            .iter()
            .all(|label| message.label_ids.contains(label));
        let query_ok = match query.query.as_deref().and_then(|q| q.strip_prefix("from:")) {
            Some(sender) => self.senders.get(id).is_some_and(|s| s == sender),
            None => true,
        };
        label_ok && query_ok
    }

    fn check_auth(&self) -> Result<(), ProviderError> {
        if self.unauthorized {
            return Err(ProviderError::Unauthorized("401 Unauthorized".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MailProvider for FakeMailbox {
    async fn list_labels(&self) -> Result<Vec<Label>, ProviderError> {
        self.check_auth()?;
        Ok(self.labels.clone())
    }

    async fn list_messages(&self, query: &ListQuery) -> Result<ListMessagesResponse, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        self.check_auth()?;

        let matching: Vec<&String> = self
            .order
            .iter()
            .filter(|id| self.matches(id, query))
            .collect();

        let offset: usize = match &query.page_token {
            Some(token) => token
                .strip_prefix("offset-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| ProviderError::Status {
                    status: 400,
                    body: format!("bad page token {}", token),
                })?,
            None => 0,
        };
        let end = (offset + query.max_results as usize).min(matching.len());

        Ok(ListMessagesResponse {
            messages: matching[offset..end]
                .iter()
                .map(|id| MessageRef::new(id.as_str()))
                .collect(),
            next_page_token: (end < matching.len()).then(|| format!("offset-{}", end)),
            result_size_estimate: Some(matching.len() as u64),
        })
    }

    async fn get_message(&self, id: &str) -> Result<Message, ProviderError> {
        self.message_calls.enter();
        tokio::time::sleep(self.latency).await;
        self.message_calls.leave();

        if self.failing_messages.contains(id) {
            return Err(ProviderError::Status {
                status: 500,
                body: "backendError".to_string(),
            });
        }
        self.messages.get(id).cloned().ok_or(ProviderError::Status {
            status: 404,
            body: "Requested entity was not found.".to_string(),
        })
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, ProviderError> {
        self.attachment_calls.enter();
        tokio::time::sleep(self.latency).await;
        self.attachment_calls.leave();

        if self.failing_attachments.contains(attachment_id) {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }
        Ok(self
            .attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
