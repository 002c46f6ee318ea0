//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Fingerprint, JobEntity, JobRecord, RawJobFields, SeenOutcome, StatusHistoryEntry};
use crate::monitor::{MonitorEvent, MonitorReporter};
use crate::rule::ExtractionRule;
use crate::status::JobStatus;
use crate::traits::{Fetcher, JobStore, Notifier, PageExtractor};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher returning canned pages.
#[derive(Clone)]
pub struct MockFetcher {
    /// Page returned for any URL without a specific response.
    default: Option<String>,
    /// Per-URL responses. Successes are reused, errors are returned once.
    responses: Arc<Mutex<HashMap<String, Result<String, AppError>>>>,
}

impl MockFetcher {
    /// Every URL returns `html`.
    pub fn new(html: &str) -> Self {
        Self {
            default: Some(html.to_string()),
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Responses keyed by URL; unknown URLs fail.
    pub fn by_url(responses: Vec<(&str, Result<String, AppError>)>) -> Self {
        Self {
            default: None,
            responses: Arc::new(Mutex::new(
                responses
                    .into_iter()
                    .map(|(url, r)| (url.to_string(), r))
                    .collect(),
            )),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let mut responses = self.responses.lock().unwrap();
        match responses.get(url) {
            Some(Ok(html)) => Ok(html.clone()),
            Some(Err(_)) => responses.remove(url).unwrap(),
            None => self
                .default
                .clone()
                .ok_or_else(|| AppError::fetch(url, "no response configured")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor mapping page content to canned fields.
#[derive(Clone, Default)]
pub struct MockExtractor {
    pages: Arc<HashMap<String, Vec<RawJobFields>>>,
    errors: Arc<Mutex<HashMap<String, AppError>>>,
}

impl MockExtractor {
    /// Pages not listed extract to no records.
    pub fn by_page(pages: Vec<(&str, Vec<RawJobFields>)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(html, fields)| (html.to_string(), fields))
                    .collect(),
            ),
            errors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fail (once) when asked to extract `html`.
    pub fn failing_on(self, html: &str, error: AppError) -> Self {
        self.errors.lock().unwrap().insert(html.to_string(), error);
        self
    }
}

impl PageExtractor for MockExtractor {
    fn extract(&self, html: &str, _rule: &ExtractionRule) -> Result<Vec<RawJobFields>, AppError> {
        if let Some(e) = self.errors.lock().unwrap().remove(html) {
            return Err(e);
        }
        Ok(self.pages.get(html).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockNotifier
// ---------------------------------------------------------------------------

/// Recorded notification: (source_name, jobs).
pub type NotifyCall = (String, Vec<JobEntity>);

/// Mock notifier that records every call.
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub calls: Arc<Mutex<Vec<NotifyCall>>>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose first call fails.
    pub fn with_error(error: AppError) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Notifier for MockNotifier {
    async fn notify(&self, source_name: &str, jobs: &[JobEntity]) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((source_name.to_string(), jobs.to_vec()));
        match self.error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock run reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MonitorReporter for MockReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        let label = match &event {
            MonitorEvent::RunStarted { .. } => "RunStarted",
            MonitorEvent::SourceStarted { .. } => "SourceStarted",
            MonitorEvent::RecordDropped { .. } => "RecordDropped",
            MonitorEvent::SourceCompleted { .. } => "SourceCompleted",
            MonitorEvent::SourceFailed { .. } => "SourceFailed",
            MonitorEvent::Notified { .. } => "Notified",
            MonitorEvent::NotifyFailed { .. } => "NotifyFailed",
            MonitorEvent::RunFinished { .. } => "RunFinished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// Store wrapper whose `upsert_seen` fails for matching records.
#[derive(Clone)]
pub struct FailingStore<S> {
    inner: S,
    company: Option<String>,
    title: Option<String>,
    /// Remaining failures; `None` fails every match.
    remaining: Arc<Mutex<Option<usize>>>,
}

impl<S: JobStore> FailingStore<S> {
    /// Fail every record of one company.
    pub fn failing_company(inner: S, company: &str) -> Self {
        Self {
            inner,
            company: Some(company.to_string()),
            title: None,
            remaining: Arc::new(Mutex::new(None)),
        }
    }

    /// Fail the first record with this title, then behave normally.
    pub fn failing_title_once(inner: S, title: &str) -> Self {
        Self {
            inner,
            company: None,
            title: Some(title.to_string()),
            remaining: Arc::new(Mutex::new(Some(1))),
        }
    }

    fn should_fail(&self, record: &JobRecord) -> bool {
        let matches = self.company.as_ref().is_none_or(|c| &record.company == c)
            && self.title.as_ref().is_none_or(|t| &record.title == t);
        if !matches {
            return false;
        }
        let mut remaining = self.remaining.lock().unwrap();
        match remaining.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl<S: JobStore> JobStore for FailingStore<S> {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<JobEntity>, AppError> {
        self.inner.lookup(fingerprint).await
    }

    async fn upsert_seen(
        &self,
        record: &JobRecord,
        fingerprint: &Fingerprint,
        observed_at: DateTime<Utc>,
    ) -> Result<SeenOutcome, AppError> {
        if self.should_fail(record) {
            return Err(AppError::DatabaseError("connection reset".into()));
        }
        self.inner.upsert_seen(record, fingerprint, observed_at).await
    }

    async fn set_status(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<JobEntity, AppError> {
        self.inner.set_status(fingerprint, status, notes, at).await
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<JobEntity>, AppError> {
        self.inner.list(status, limit).await
    }

    async fn history(&self, fingerprint: &Fingerprint) -> Result<Vec<StatusHistoryEntry>, AppError> {
        self.inner.history(fingerprint).await
    }

    async fn count_by_status(&self) -> Result<Vec<(JobStatus, i64)>, AppError> {
        self.inner.count_by_status().await
    }
}
