use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::fingerprint::fingerprint_with;
use crate::keyword::KeywordFilter;
use crate::models::{JobEntity, JobRecord};
use crate::rule::FingerprintMode;
use crate::traits::JobStore;

/// What one source's batch did to the store.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Every record's entity, paired with whether this batch created it.
    pub observed: Vec<(JobEntity, bool)>,
    /// Newly created entities whose title passed the keyword filter.
    pub notify_worthy: Vec<JobEntity>,
}

impl BatchOutcome {
    pub fn new_count(&self) -> usize {
        self.observed.iter().filter(|(_, is_new)| *is_new).count()
    }
}

/// A batch that stopped on a store error.
///
/// `partial` holds what the records before the failing one already did to
/// the store; those entities are persisted and will not be new again.
#[derive(Debug)]
pub struct BatchAborted {
    pub partial: BatchOutcome,
    pub error: AppError,
}

/// Splits a batch of normalized records into known and new jobs.
#[derive(Clone)]
pub struct DiffEngine<S: JobStore> {
    store: S,
    filter: KeywordFilter,
}

impl<S: JobStore> DiffEngine<S> {
    pub fn new(store: S, filter: KeywordFilter) -> Self {
        Self { store, filter }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record every job in `records` as seen and pick out the notify-worthy ones.
    ///
    /// A store error stops the batch at the failing record and hands back
    /// everything processed before it, so already-created jobs can still be
    /// notified.
    pub async fn process_batch(
        &self,
        source_name: &str,
        records: &[JobRecord],
        mode: FingerprintMode,
        observed_at: DateTime<Utc>,
    ) -> Result<BatchOutcome, BatchAborted> {
        let mut outcome = BatchOutcome::default();

        for record in records {
            let fp = fingerprint_with(record, mode);
            let seen = match self.store.upsert_seen(record, &fp, observed_at).await {
                Ok(seen) => seen,
                Err(error) => {
                    tracing::warn!(
                        source = %source_name,
                        processed = outcome.observed.len(),
                        total = records.len(),
                        %error,
                        "Batch aborted by store error"
                    );
                    return Err(BatchAborted {
                        partial: outcome,
                        error,
                    });
                }
            };
            if seen.created {
                tracing::debug!(
                    source = %source_name,
                    fingerprint = %fp.short(),
                    title = %record.title,
                    "New job discovered"
                );
                if self.filter.matches(&seen.entity.title) {
                    outcome.notify_worthy.push(seen.entity.clone());
                }
            }
            outcome.observed.push((seen.entity, seen.created));
        }

        tracing::info!(
            source = %source_name,
            total = records.len(),
            new = outcome.new_count(),
            notify_worthy = outcome.notify_worthy.len(),
            "Batch processed"
        );

        Ok(outcome)
    }
}
