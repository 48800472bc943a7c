//! The harvesting pipeline: Enumerator -> Fetcher -> Extractor -> Persister.

pub mod enumerator;
pub mod extractor;
pub mod fetcher;
pub mod pacing;
pub mod persister;
pub mod progress;
pub mod runner;

pub use enumerator::{Enumerator, SelectionCriterion};
pub use extractor::{extract, extract_message, AttachmentDescriptor, PayloadShape};
pub use fetcher::{Fetcher, DEFAULT_FETCH_BATCH_SIZE};
pub use pacing::{limiter_from_config, FixedDelay, NoDelay, RateLimiter, TokenBucket};
pub use persister::{
    decode_attachment_data, PersistFailure, PersistOutcome, PersistedFile, Persister,
    DEFAULT_PERSIST_BATCH_SIZE,
};
pub use progress::{LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{HarvestReport, Harvester};
