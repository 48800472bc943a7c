use std::time::Duration;

use tracing::{debug, info};

/// Events emitted while a harvest runs. Purely informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    PageRead { page: usize },
    PagesDone { messages: usize },
    MessagesFetched { done: usize, total: usize },
    Waiting { delay: Duration },
    AttachmentsFound { count: usize },
    AttachmentsSaved { done: usize, total: usize },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards progress to the tracing subscriber.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PageRead { page } => debug!(page, "Reading page"),
            ProgressEvent::PagesDone { messages } => info!(messages, "All pages are read"),
            ProgressEvent::MessagesFetched { done, total } => {
                info!("Fetched {}/{} emails", done, total)
            }
            ProgressEvent::Waiting { delay } => {
                debug!("Waiting {:?} before next batch", delay)
            }
            ProgressEvent::AttachmentsFound { count } => info!(count, "Attachments found"),
            ProgressEvent::AttachmentsSaved { done, total } => {
                info!("Saved {}/{} attachments", done, total)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Collects every event for assertions.
    #[derive(Default)]
    pub struct RecordingProgress {
        pub events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, event: ProgressEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }
}
