//! In-memory [`JobStore`] for tests and one-off dry runs.
//!
//! Both tables sit behind a single `std::sync::Mutex`, so every operation,
//! including the read-check-write of `upsert_seen`, is atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    DISCOVERED_NOTE, Fingerprint, JobEntity, JobRecord, SeenOutcome, StatusHistoryEntry,
};
use crate::status::JobStatus;
use crate::traits::JobStore;

#[derive(Default)]
struct Tables {
    jobs: HashMap<Fingerprint, JobEntity>,
    /// Insertion order doubles as the tie-breaker for equal timestamps.
    history: Vec<StatusHistoryEntry>,
}

/// In-memory job store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::DatabaseError("memory store lock poisoned".into()))
    }
}

impl JobStore for MemoryJobStore {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<JobEntity>, AppError> {
        Ok(self.lock()?.jobs.get(fingerprint).cloned())
    }

    async fn upsert_seen(
        &self,
        record: &JobRecord,
        fingerprint: &Fingerprint,
        observed_at: DateTime<Utc>,
    ) -> Result<SeenOutcome, AppError> {
        let mut tables = self.lock()?;

        if let Some(entity) = tables.jobs.get_mut(fingerprint) {
            let changed = entity.observe(record, observed_at);
            if !changed.is_empty() {
                tracing::debug!(fingerprint = %fingerprint.short(), ?changed, "Job details revised");
            }
            return Ok(SeenOutcome {
                entity: entity.clone(),
                created: false,
            });
        }

        let entity = JobEntity::discovered(record, fingerprint.clone(), observed_at);
        tables.jobs.insert(fingerprint.clone(), entity.clone());
        tables.history.push(StatusHistoryEntry {
            fingerprint: fingerprint.clone(),
            status: JobStatus::New,
            timestamp: observed_at,
            notes: Some(DISCOVERED_NOTE.to_string()),
        });

        Ok(SeenOutcome {
            entity,
            created: true,
        })
    }

    async fn set_status(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<JobEntity, AppError> {
        let mut tables = self.lock()?;

        let entity = tables
            .jobs
            .get_mut(fingerprint)
            .ok_or_else(|| AppError::NotFound(fingerprint.to_string()))?;
        entity.status = status;
        entity.notes = notes.map(str::to_string);
        entity.last_updated = at;
        let updated = entity.clone();

        tables.history.push(StatusHistoryEntry {
            fingerprint: fingerprint.clone(),
            status,
            timestamp: at,
            notes: notes.map(str::to_string),
        });

        Ok(updated)
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<JobEntity>, AppError> {
        let tables = self.lock()?;
        let mut jobs: Vec<_> = tables
            .jobs
            .values()
            .filter(|j| status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.first_seen
                .cmp(&a.first_seen)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn history(&self, fingerprint: &Fingerprint) -> Result<Vec<StatusHistoryEntry>, AppError> {
        let tables = self.lock()?;
        let mut entries: Vec<_> = tables
            .history
            .iter()
            .filter(|h| &h.fingerprint == fingerprint)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        entries.sort_by_key(|h| h.timestamp);
        Ok(entries)
    }

    async fn count_by_status(&self) -> Result<Vec<(JobStatus, i64)>, AppError> {
        let tables = self.lock()?;
        let mut counts: Vec<(JobStatus, i64)> = JobStatus::ALL
            .iter()
            .map(|s| (*s, tables.jobs.values().filter(|j| j.status == *s).count() as i64))
            .filter(|(_, n)| *n > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts)
    }
}
