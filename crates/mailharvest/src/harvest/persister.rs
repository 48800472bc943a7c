//! Batched download and storage of attachment bytes.

use std::path::PathBuf;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use futures_util::future::join_all;
use tracing::{debug, error};

use crate::error::PersistError;
use crate::provider::MailProvider;
use crate::storage::FileStorage;

use super::extractor::AttachmentDescriptor;
use super::pacing::RateLimiter;
use super::progress::{ProgressEvent, ProgressReporter};

pub const DEFAULT_PERSIST_BATCH_SIZE: usize = 100;

/// Standard alphabet, padding optional.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An attachment written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFile {
    pub name: String,
    pub path: PathBuf,
}

/// An attachment that could not be saved, under the name it was meant to get.
#[derive(Debug)]
pub struct PersistFailure {
    pub name: String,
    pub error: PersistError,
}

pub type PersistOutcome = Result<PersistedFile, PersistFailure>;

/// Decodes the provider's URL-safe base64 (`-` and `_`) into raw bytes.
pub fn decode_attachment_data(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let standard: String = data
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    STANDARD_LENIENT.decode(standard.as_bytes())
}

pub struct Persister<'a, P: MailProvider + ?Sized> {
    provider: &'a P,
    storage: &'a FileStorage,
    batch_size: usize,
    limiter: &'a dyn RateLimiter,
    progress: &'a dyn ProgressReporter,
}

impl<'a, P: MailProvider + ?Sized> Persister<'a, P> {
    pub fn new(
        provider: &'a P,
        storage: &'a FileStorage,
        batch_size: usize,
        limiter: &'a dyn RateLimiter,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            provider,
            storage,
            batch_size: batch_size.max(1),
            limiter,
            progress,
        }
    }

    /// Downloads and writes every descriptor with a non-empty attachment id.
    /// One outcome per attempted descriptor, in input order.
    pub async fn persist_all(&self, descriptors: &[AttachmentDescriptor]) -> Vec<PersistOutcome> {
        let valid: Vec<&AttachmentDescriptor> = descriptors
            .iter()
            .filter(|d| !d.attachment_id.is_empty())
            .collect();

        let total = valid.len();
        let batch_count = total.div_ceil(self.batch_size);
        let mut outcomes = Vec::with_capacity(total);

        for (index, batch) in valid.chunks(self.batch_size).enumerate() {
            let saved = join_all(batch.iter().map(|d| self.persist_one(d))).await;
            outcomes.extend(saved);

            self.progress.report(ProgressEvent::AttachmentsSaved {
                done: outcomes.len(),
                total,
            });

            if index + 1 < batch_count {
                self.limiter.between_batches(batch.len()).await;
            }
        }

        outcomes
    }

    async fn persist_one(&self, descriptor: &AttachmentDescriptor) -> PersistOutcome {
        match self.download_and_store(descriptor).await {
            Ok(path) => {
                debug!("Saved {} to {}", descriptor.name, path.display());
                Ok(PersistedFile {
                    name: descriptor.name.clone(),
                    path,
                })
            }
            Err(e) => {
                error!(
                    "Failed to save attachment {} from message {}: {}",
                    descriptor.name, descriptor.mail_id, e
                );
                Err(PersistFailure {
                    name: descriptor.name.clone(),
                    error: e,
                })
            }
        }
    }

    async fn download_and_store(
        &self,
        descriptor: &AttachmentDescriptor,
    ) -> Result<PathBuf, PersistError> {
        let body = self
            .provider
            .get_attachment(&descriptor.mail_id, &descriptor.attachment_id)
            .await?;

        let data = match body.data {
            Some(data) => data,
            None if body.size == 0 => return Err(PersistError::EmptyResponse),
            None => return Err(PersistError::MissingData),
        };

        let content = decode_attachment_data(&data)?;
        Ok(self.storage.store(&descriptor.name, &content).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacingConfig;
    use crate::harvest::pacing::limiter_from_config;
    use crate::harvest::progress::recording::RecordingProgress;
    use crate::provider::{
        AttachmentBody, Label, ListMessagesResponse, ListQuery, Message, ProviderError,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::Instant;

    /// Serves `"hi"` for every attachment and records which ids were asked for.
    #[derive(Default)]
    struct AttachmentServer {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailProvider for AttachmentServer {
        async fn list_labels(&self) -> Result<Vec<Label>, ProviderError> {
            Ok(Vec::new())
        }

        async fn list_messages(&self, _q: &ListQuery) -> Result<ListMessagesResponse, ProviderError> {
            Ok(ListMessagesResponse::default())
        }

        async fn get_message(&self, id: &str) -> Result<Message, ProviderError> {
            Ok(Message {
                id: id.to_string(),
                ..Message::default()
            })
        }

        async fn get_attachment(&self, _m: &str, a: &str) -> Result<AttachmentBody, ProviderError> {
            self.requested.lock().unwrap().push(a.to_string());
            Ok(AttachmentBody {
                size: 2,
                data: Some("aGk".to_string()),
            })
        }
    }

    fn descriptor(mail_id: &str, name: &str, attachment_id: &str) -> AttachmentDescriptor {
        AttachmentDescriptor {
            mail_id: mail_id.to_string(),
            name: name.to_string(),
            attachment_id: attachment_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_attachment_id_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let server = AttachmentServer::default();
        let limiter = limiter_from_config(&PacingConfig::None);
        let progress = RecordingProgress::default();
        let persister = Persister::new(&server, &storage, 100, limiter.as_ref(), &progress);

        let outcomes = persister
            .persist_all(&[
                descriptor("m1", "kept.txt", "A1"),
                descriptor("m1", "dropped.txt", ""),
            ])
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].as_ref().unwrap().name, "kept.txt");
        assert_eq!(*server.requested.lock().unwrap(), vec!["A1".to_string()]);
        assert!(!temp_dir.path().join("dropped.txt").exists());
        assert_eq!(
            *progress.events.lock().unwrap(),
            vec![ProgressEvent::AttachmentsSaved { done: 1, total: 1 }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pacing_runs_batches_back_to_back() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let server = AttachmentServer::default();
        let limiter = limiter_from_config(&PacingConfig::None);
        let progress = RecordingProgress::default();
        let persister = Persister::new(
            &server,
            &storage,
            DEFAULT_PERSIST_BATCH_SIZE,
            limiter.as_ref(),
            &progress,
        );

        let descriptors: Vec<AttachmentDescriptor> = (0..150)
            .map(|i| descriptor(&format!("m{}", i), &format!("f{}.txt", i), "A"))
            .collect();

        let start = Instant::now();
        let outcomes = persister.persist_all(&descriptors).await;

        assert_eq!(outcomes.len(), 150);
        assert!(outcomes.iter().all(|o| o.is_ok()));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(
            *progress.events.lock().unwrap(),
            vec![
                ProgressEvent::AttachmentsSaved { done: 100, total: 150 },
                ProgressEvent::AttachmentsSaved { done: 150, total: 150 },
            ]
        );
        assert_eq!(std::fs::read(temp_dir.path().join("f149.txt")).unwrap(), b"hi");
    }

    #[test]
    fn test_decode_url_safe() {
        // 0xfb 0xff 0xfe encodes to "-__-" in the URL-safe alphabet
        assert_eq!(decode_attachment_data("-__-").unwrap(), vec![0xfb, 0xff, 0xfe]);
    }

    #[test]
    fn test_decode_with_and_without_padding() {
        assert_eq!(decode_attachment_data("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_attachment_data("aGVsbG8").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_invalid() {
        assert!(decode_attachment_data("not base64!").is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_attachment_data("").unwrap().is_empty());
    }
}
