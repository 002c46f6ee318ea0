use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Fingerprint, JobEntity, JobRecord, RawJobFields, SeenOutcome, StatusHistoryEntry};
use crate::rule::ExtractionRule;
use crate::status::JobStatus;

/// Fetches raw HTML content from a URL.
///
/// Failures are reported as [`AppError::FetchError`].
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Applies an extraction rule to a fetched page.
pub trait PageExtractor: Send + Sync + Clone {
    /// Returns one entry per job container found, in document order.
    fn extract(&self, html: &str, rule: &ExtractionRule) -> Result<Vec<RawJobFields>, AppError>;
}

/// Receives newly discovered jobs that passed the keyword filter.
pub trait Notifier: Send + Sync + Clone {
    fn notify(
        &self,
        source_name: &str,
        jobs: &[JobEntity],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Durable job table keyed by fingerprint plus the append-only status ledger.
///
/// Implementations must make `upsert_seen` atomic per fingerprint so two
/// sources surfacing the same posting cannot both create it.
pub trait JobStore: Send + Sync + Clone {
    fn lookup(
        &self,
        fingerprint: &Fingerprint,
    ) -> impl Future<Output = Result<Option<JobEntity>, AppError>> + Send;

    /// Record that `record` was seen at `observed_at`.
    ///
    /// Creates the job with status `new` (and its first history entry) when
    /// unknown; otherwise refreshes its descriptive fields and `last_updated`
    /// without touching its status.
    fn upsert_seen(
        &self,
        record: &JobRecord,
        fingerprint: &Fingerprint,
        observed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<SeenOutcome, AppError>> + Send;

    /// Change a job's status and append a history entry.
    ///
    /// Fails with [`AppError::NotFound`] for an unknown fingerprint.
    fn set_status(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<JobEntity, AppError>> + Send;

    /// Jobs ordered by `first_seen` descending.
    fn list(
        &self,
        status: Option<JobStatus>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<JobEntity>, AppError>> + Send;

    /// Status history ordered by timestamp ascending.
    fn history(
        &self,
        fingerprint: &Fingerprint,
    ) -> impl Future<Output = Result<Vec<StatusHistoryEntry>, AppError>> + Send;

    /// Number of jobs per status, for statuses that have at least one job.
    fn count_by_status(&self) -> impl Future<Output = Result<Vec<(JobStatus, i64)>, AppError>> + Send;
}
