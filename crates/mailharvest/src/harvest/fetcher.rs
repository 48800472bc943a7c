//! Batched retrieval of full messages.

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::provider::{MailProvider, Message, MessageRef};

use super::pacing::RateLimiter;
use super::progress::{ProgressEvent, ProgressReporter};

pub const DEFAULT_FETCH_BATCH_SIZE: usize = 100;

pub struct Fetcher<'a, P: MailProvider + ?Sized> {
    provider: &'a P,
    batch_size: usize,
    limiter: &'a dyn RateLimiter,
    progress: &'a dyn ProgressReporter,
}

impl<'a, P: MailProvider + ?Sized> Fetcher<'a, P> {
    pub fn new(
        provider: &'a P,
        batch_size: usize,
        limiter: &'a dyn RateLimiter,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            limiter,
            progress,
        }
    }

    /// Fetches every referenced message. Requests within a batch are in flight
    /// together; batches run one after another with the limiter awaited in
    /// between. A failed fetch leaves `None` at that position.
    pub async fn fetch_all(&self, refs: &[MessageRef]) -> Vec<Option<Message>> {
        let ids: Vec<&str> = refs
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.len() < refs.len() {
            debug!("Skipping {} message refs without an id", refs.len() - ids.len());
        }

        let total = ids.len();
        let batch_count = total.div_ceil(self.batch_size);
        let mut results = Vec::with_capacity(total);

        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            let fetched = join_all(batch.iter().map(|id| self.fetch_one(id))).await;
            results.extend(fetched);

            self.progress.report(ProgressEvent::MessagesFetched {
                done: results.len(),
                total,
            });

            if index + 1 < batch_count {
                let waited = self.limiter.between_batches(batch.len()).await;
                if !waited.is_zero() {
                    self.progress.report(ProgressEvent::Waiting { delay: waited });
                }
            }
        }

        results
    }

    async fn fetch_one(&self, id: &str) -> Option<Message> {
        match self.provider.get_message(id).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Failed to fetch email {}: {}", id, e);
                None
            }
        }
    }
}
