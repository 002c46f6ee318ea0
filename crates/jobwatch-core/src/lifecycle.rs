use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Fingerprint, JobEntity, StatusHistoryEntry};
use crate::status::JobStatus;
use crate::traits::JobStore;

/// Operator-facing status changes on tracked jobs.
///
/// Validates the target status, records every change in the history ledger,
/// and never blocks an off-path transition (it is only logged).
#[derive(Clone)]
pub struct StatusLifecycle<S: JobStore> {
    store: S,
}

impl<S: JobStore> StatusLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Parse `status` and apply it. Fails with [`AppError::InvalidStatus`]
    /// before touching the store when the status is unrecognized.
    pub async fn update_status(
        &self,
        fingerprint: &Fingerprint,
        status: &str,
        notes: Option<&str>,
    ) -> Result<JobEntity, AppError> {
        let status: JobStatus = status.parse()?;
        self.transition(fingerprint, status, notes).await
    }

    pub async fn transition(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
    ) -> Result<JobEntity, AppError> {
        self.transition_at(fingerprint, status, notes, Utc::now()).await
    }

    /// Apply `status` as of `at`. A time earlier than the job's last update
    /// is raised to it, so history never runs backwards.
    pub async fn transition_at(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<JobEntity, AppError> {
        let current = self
            .store
            .lookup(fingerprint)
            .await?
            .ok_or_else(|| AppError::NotFound(fingerprint.to_string()))?;

        if !current.status.is_expected_successor(status) {
            tracing::debug!(
                fingerprint = %fingerprint.short(),
                from = %current.status,
                to = %status,
                "Off-path status transition"
            );
        }

        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status updated to {status}"));

        let updated = self
            .store
            .set_status(fingerprint, status, Some(&notes), at.max(current.last_updated))
            .await?;
        tracing::info!(fingerprint = %fingerprint.short(), %status, "Job status updated");
        Ok(updated)
    }

    pub async fn history(&self, fingerprint: &Fingerprint) -> Result<Vec<StatusHistoryEntry>, AppError> {
        self.store.history(fingerprint).await
    }
}
