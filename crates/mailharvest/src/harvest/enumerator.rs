//! Mailbox enumeration: turns a selection criterion into the list of matching
//! message references, walking pagination where the criterion allows it.

use tracing::{debug, info};

use crate::config::PageSizes;
use crate::error::{HarvestError, Result};
use crate::provider::{ListQuery, MailProvider, MessageRef};

use super::progress::{ProgressEvent, ProgressReporter};

/// Which messages a run harvests. Chosen once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCriterion {
    /// Messages carrying the label with this display name.
    ByLabel(String),
    /// Messages matching `from:<address>`. Only the first page is read.
    BySender(String),
    All,
}

impl std::fmt::Display for SelectionCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionCriterion::ByLabel(name) => write!(f, "label \"{}\"", name),
            SelectionCriterion::BySender(address) => write!(f, "sender {}", address),
            SelectionCriterion::All => write!(f, "all messages"),
        }
    }
}

pub struct Enumerator<'a, P: MailProvider + ?Sized> {
    provider: &'a P,
    page_sizes: PageSizes,
    progress: &'a dyn ProgressReporter,
}

impl<'a, P: MailProvider + ?Sized> Enumerator<'a, P> {
    pub fn new(provider: &'a P, page_sizes: PageSizes, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            provider,
            page_sizes,
            progress,
        }
    }

    /// Returns every matching reference in provider order. Any provider error
    /// aborts the enumeration.
    pub async fn enumerate(&self, criterion: &SelectionCriterion) -> Result<Vec<MessageRef>> {
        info!("Enumerating {}", criterion);

        let refs = match criterion {
            SelectionCriterion::ByLabel(name) => {
                let label_id = self.resolve_label(name).await?;
                let query = ListQuery {
                    label_ids: vec![label_id],
                    max_results: self.page_sizes.label,
                    ..ListQuery::default()
                };
                self.list_all_pages(query).await?
            }
            SelectionCriterion::BySender(address) => {
                let query = ListQuery {
                    query: Some(format!("from:{}", address)),
                    max_results: self.page_sizes.sender,
                    ..ListQuery::default()
                };
                self.list_first_page(query).await?
            }
            SelectionCriterion::All => {
                let query = ListQuery {
                    max_results: self.page_sizes.all,
                    ..ListQuery::default()
                };
                self.list_all_pages(query).await?
            }
        };

        self.progress.report(ProgressEvent::PagesDone {
            messages: refs.len(),
        });
        info!("Found {} messages for {}", refs.len(), criterion);
        Ok(refs)
    }

    /// Maps a label's display name to its id.
    pub async fn resolve_label(&self, name: &str) -> Result<String> {
        let labels = self.provider.list_labels().await?;
        labels
            .into_iter()
            .find(|label| label.name == name)
            .map(|label| {
                debug!("Label \"{}\" resolved to {}", name, label.id);
                label.id
            })
            .ok_or_else(|| HarvestError::LabelNotFound(name.to_string()))
    }

    async fn list_all_pages(&self, query: ListQuery) -> Result<Vec<MessageRef>> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0;

        loop {
            page += 1;
            self.progress.report(ProgressEvent::PageRead { page });

            let response = self
                .provider
                .list_messages(&query.with_page_token(page_token.take()))
                .await?;
            debug!(
                "Page {} returned {} messages (more: {})",
                page,
                response.messages.len(),
                response.next_page_token.is_some()
            );
            refs.extend(response.messages);

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(refs)
    }

    async fn list_first_page(&self, query: ListQuery) -> Result<Vec<MessageRef>> {
        self.progress.report(ProgressEvent::PageRead { page: 1 });
        let response = self.provider.list_messages(&query).await?;
        if response.next_page_token.is_some() {
            info!(
                "Sender search has more than {} results; only the first page is harvested",
                query.max_results
            );
        }
        Ok(response.messages)
    }
}
