//! One monitoring run over every configured source.
//!
//! Each source goes fetch → extract → normalize → diff → notify. A failure in
//! any step is recorded on that source's [`SourceOutcome`] and never stops
//! the other sources.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::diff::{BatchAborted, BatchOutcome, DiffEngine};
use crate::error::AppError;
use crate::models::{JobEntity, JobRecord};
use crate::normalize::normalize;
use crate::rule::SourceConfig;
use crate::traits::{Fetcher, JobStore, Notifier, PageExtractor};

/// Events emitted during a run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum MonitorEvent<'a> {
    RunStarted {
        run_id: Uuid,
        sources: usize,
    },
    SourceStarted {
        source: &'a str,
        url: &'a str,
    },
    RecordDropped {
        source: &'a str,
        reason: &'a str,
    },
    SourceCompleted {
        source: &'a str,
        records: usize,
        new_jobs: usize,
        notify_worthy: usize,
    },
    SourceFailed {
        source: &'a str,
        error: &'a str,
    },
    Notified {
        source: &'a str,
        jobs: usize,
    },
    NotifyFailed {
        source: &'a str,
        error: &'a str,
    },
    RunFinished {
        run_id: Uuid,
        succeeded: usize,
        failed: usize,
        notified: usize,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait MonitorReporter: Send + Sync {
    fn report(&self, event: MonitorEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitorReporter;

impl MonitorReporter for TracingMonitorReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        match event {
            MonitorEvent::RunStarted { run_id, sources } => {
                tracing::info!(%run_id, %sources, "Monitoring run started");
            }
            MonitorEvent::SourceStarted { source, url } => {
                tracing::info!(%source, %url, "Scraping source");
            }
            MonitorEvent::RecordDropped { source, reason } => {
                tracing::debug!(%source, %reason, "Dropped incomplete record");
            }
            MonitorEvent::SourceCompleted {
                source,
                records,
                new_jobs,
                notify_worthy,
            } => {
                tracing::info!(%source, %records, %new_jobs, %notify_worthy, "Source completed");
            }
            MonitorEvent::SourceFailed { source, error } => {
                tracing::warn!(%source, %error, "Source failed");
            }
            MonitorEvent::Notified { source, jobs } => {
                tracing::info!(%source, %jobs, "Notification sent");
            }
            MonitorEvent::NotifyFailed { source, error } => {
                tracing::error!(%source, %error, "Notification failed");
            }
            MonitorEvent::RunFinished {
                run_id,
                succeeded,
                failed,
                notified,
            } => {
                tracing::info!(%run_id, %succeeded, %failed, %notified, "Monitoring run finished");
            }
        }
    }
}

/// How one source fared in a run.
#[derive(Debug, Clone)]
pub enum SourceResult {
    Scraped {
        /// Records that survived normalization.
        records: usize,
        /// Records dropped as incomplete.
        dropped: usize,
        new_jobs: usize,
        notify_worthy: Vec<JobEntity>,
        notify_error: Option<String>,
    },
    /// The source stopped early. Jobs the store had already created before
    /// the failure are still notified.
    Failed {
        error: String,
        notify_worthy: Vec<JobEntity>,
        notify_error: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: String,
    pub result: SourceResult,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, SourceResult::Scraped { .. })
    }

    pub fn notify_worthy(&self) -> &[JobEntity] {
        match &self.result {
            SourceResult::Scraped { notify_worthy, .. }
            | SourceResult::Failed { notify_worthy, .. } => notify_worthy,
        }
    }
}

/// Aggregated result of one run, in configured source order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<SourceOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn notify_worthy(&self) -> impl Iterator<Item = &JobEntity> {
        self.outcomes.iter().flat_map(|o| o.notify_worthy())
    }
}

struct Scraped {
    records: usize,
    dropped: usize,
    batch: BatchOutcome,
}

/// A source that failed, with whatever its batch committed first.
struct ScrapeFailed {
    error: AppError,
    partial: Option<BatchOutcome>,
}

impl From<AppError> for ScrapeFailed {
    fn from(error: AppError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

impl From<BatchAborted> for ScrapeFailed {
    fn from(aborted: BatchAborted) -> Self {
        Self {
            error: aborted.error,
            partial: Some(aborted.partial),
        }
    }
}

/// Runs the scrape → diff → notify pipeline over all sources.
///
/// Generic over all external dependencies via traits, enabling dependency
/// injection and testability without real HTTP.
pub struct JobMonitor<F, X, S, N>
where
    F: Fetcher,
    X: PageExtractor,
    S: JobStore,
    N: Notifier,
{
    fetcher: F,
    extractor: X,
    engine: DiffEngine<S>,
    notifier: N,
    sources: Vec<SourceConfig>,
    max_concurrent_sources: usize,
}

impl<F, X, S, N> JobMonitor<F, X, S, N>
where
    F: Fetcher,
    X: PageExtractor,
    S: JobStore,
    N: Notifier,
{
    pub fn new(fetcher: F, extractor: X, store: S, notifier: N, config: &MonitorConfig) -> Self {
        Self {
            fetcher,
            extractor,
            engine: DiffEngine::new(store, config.keyword_filter()),
            notifier,
            sources: config.sources.clone(),
            max_concurrent_sources: config.max_concurrent_sources.max(1),
        }
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    /// Run one cycle stamped with the current time.
    pub async fn run_once<R: MonitorReporter>(&self, reporter: &R) -> RunReport {
        self.run_at(Utc::now(), reporter).await
    }

    /// Run one cycle, recording every observation at `observed_at`.
    pub async fn run_at<R: MonitorReporter>(
        &self,
        observed_at: DateTime<Utc>,
        reporter: &R,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        reporter.report(MonitorEvent::RunStarted {
            run_id,
            sources: self.sources.len(),
        });

        let outcomes: Vec<SourceOutcome> = futures::stream::iter(&self.sources)
            .map(|source| self.run_source(source, observed_at, reporter))
            .buffered(self.max_concurrent_sources)
            .collect()
            .await;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        reporter.report(MonitorEvent::RunFinished {
            run_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            notified: report.notify_worthy().count(),
        });
        report
    }

    async fn run_source<R: MonitorReporter>(
        &self,
        source: &SourceConfig,
        observed_at: DateTime<Utc>,
        reporter: &R,
    ) -> SourceOutcome {
        reporter.report(MonitorEvent::SourceStarted {
            source: &source.name,
            url: &source.url,
        });

        let scraped = match self.scrape_source(source, observed_at, reporter).await {
            Ok(scraped) => scraped,
            Err(failed) => {
                let error = failed.error.to_string();
                reporter.report(MonitorEvent::SourceFailed {
                    source: &source.name,
                    error: &error,
                });
                let notify_worthy = failed
                    .partial
                    .map(|batch| batch.notify_worthy)
                    .unwrap_or_default();
                let notify_error = self.notify(source, &notify_worthy, reporter).await;
                return SourceOutcome {
                    source: source.name.clone(),
                    result: SourceResult::Failed {
                        error,
                        notify_worthy,
                        notify_error,
                    },
                };
            }
        };

        let new_jobs = scraped.batch.new_count();
        let notify_worthy = scraped.batch.notify_worthy;
        reporter.report(MonitorEvent::SourceCompleted {
            source: &source.name,
            records: scraped.records,
            new_jobs,
            notify_worthy: notify_worthy.len(),
        });
        let notify_error = self.notify(source, &notify_worthy, reporter).await;

        SourceOutcome {
            source: source.name.clone(),
            result: SourceResult::Scraped {
                records: scraped.records,
                dropped: scraped.dropped,
                new_jobs,
                notify_worthy,
                notify_error,
            },
        }
    }

    /// Hand `jobs` to the notifier unless empty. Returns the failure, if any.
    async fn notify<R: MonitorReporter>(
        &self,
        source: &SourceConfig,
        jobs: &[JobEntity],
        reporter: &R,
    ) -> Option<String> {
        if jobs.is_empty() {
            return None;
        }
        match self.notifier.notify(&source.name, jobs).await {
            Ok(()) => {
                reporter.report(MonitorEvent::Notified {
                    source: &source.name,
                    jobs: jobs.len(),
                });
                None
            }
            Err(e) => {
                let error = e.to_string();
                reporter.report(MonitorEvent::NotifyFailed {
                    source: &source.name,
                    error: &error,
                });
                Some(error)
            }
        }
    }

    async fn scrape_source<R: MonitorReporter>(
        &self,
        source: &SourceConfig,
        observed_at: DateTime<Utc>,
        reporter: &R,
    ) -> Result<Scraped, ScrapeFailed> {
        let html = self.fetcher.fetch(&source.url).await?;
        tracing::debug!(source = %source.name, bytes = html.len(), "Fetched listing page");

        let raw = self.extractor.extract(&html, &source.rule())?;
        if raw.is_empty() {
            tracing::warn!(source = %source.name, "No job containers matched");
        }

        let mut records: Vec<JobRecord> = Vec::with_capacity(raw.len());
        let mut dropped = 0;
        for fields in &raw {
            match normalize(fields, &source.name, &source.url) {
                Ok(record) => records.push(record),
                Err(e) => {
                    dropped += 1;
                    reporter.report(MonitorEvent::RecordDropped {
                        source: &source.name,
                        reason: &e.to_string(),
                    });
                }
            }
        }

        let batch = self
            .engine
            .process_batch(&source.name, &records, source.fingerprint, observed_at)
            .await?;

        Ok(Scraped {
            records: records.len(),
            dropped,
            batch,
        })
    }
}
