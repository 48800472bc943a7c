use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::Result;
use crate::provider::MailProvider;
use crate::storage::FileStorage;

use super::enumerator::{Enumerator, SelectionCriterion};
use super::extractor::extract;
use super::fetcher::Fetcher;
use super::pacing::{limiter_from_config, RateLimiter};
use super::persister::Persister;
use super::progress::{ProgressEvent, ProgressReporter};

/// Tally of one harvest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub messages_listed: usize,
    pub messages_fetched: usize,
    pub fetch_failures: usize,
    pub attachments_found: usize,
    pub attachments_saved: usize,
    pub save_failures: usize,
    pub saved_paths: Vec<PathBuf>,
}

/// Drives enumeration, fetching, extraction and persistence for one mailbox.
pub struct Harvester<P: MailProvider> {
    provider: P,
    storage: FileStorage,
    config: Config,
    fetch_limiter: Box<dyn RateLimiter>,
    persist_limiter: Box<dyn RateLimiter>,
    progress: Arc<dyn ProgressReporter>,
}

impl<P: MailProvider> Harvester<P> {
    pub fn new(provider: P, config: Config, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            storage: FileStorage::new(&config.output_directory),
            fetch_limiter: limiter_from_config(&config.fetch.pacing),
            persist_limiter: limiter_from_config(&config.persist.pacing),
            provider,
            config,
            progress,
        }
    }

    /// Replaces the limiter used between fetch batches.
    pub fn with_fetch_limiter(mut self, limiter: Box<dyn RateLimiter>) -> Self {
        self.fetch_limiter = limiter;
        self
    }

    /// Runs the whole pipeline. Only enumeration (and credential) failures are
    /// returned as errors; per-message and per-attachment failures are counted.
    pub async fn run(&self, criterion: &SelectionCriterion) -> Result<HarvestReport> {
        let progress = self.progress.as_ref();
        let mut report = HarvestReport::default();

        let refs = Enumerator::new(&self.provider, self.config.page_sizes, progress)
            .enumerate(criterion)
            .instrument(info_span!("enumerate", criterion = %criterion))
            .await?;
        report.messages_listed = refs.len();

        let fetched = Fetcher::new(
            &self.provider,
            self.config.fetch.batch_size,
            self.fetch_limiter.as_ref(),
            progress,
        )
        .fetch_all(&refs)
        .instrument(info_span!("fetch", messages = refs.len()))
        .await;
        report.messages_fetched = fetched.iter().filter(|m| m.is_some()).count();
        report.fetch_failures = fetched.len() - report.messages_fetched;
        if report.fetch_failures > 0 {
            warn!("{} messages could not be fetched", report.fetch_failures);
        }

        let descriptors = extract(&fetched);
        report.attachments_found = descriptors.len();
        progress.report(ProgressEvent::AttachmentsFound {
            count: descriptors.len(),
        });

        let outcomes = Persister::new(
            &self.provider,
            &self.storage,
            self.config.persist.batch_size,
            self.persist_limiter.as_ref(),
            progress,
        )
        .persist_all(&descriptors)
        .instrument(info_span!("persist", attachments = descriptors.len()))
        .await;

        for outcome in outcomes {
            match outcome {
                Ok(file) => {
                    report.attachments_saved += 1;
                    report.saved_paths.push(file.path);
                }
                Err(_) => report.save_failures += 1,
            }
        }

        info!(
            "Harvest complete: {} saved, {} failed, {} messages unreadable",
            report.attachments_saved, report.save_failures, report.fetch_failures
        );
        Ok(report)
    }
}
