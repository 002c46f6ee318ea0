use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::status::JobStatus;

/// Text pulled out of one job container, before normalization.
///
/// `title` and `link` are mandatory for a usable record; the rest are
/// absent when the source's rule has no selector for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawJobFields {
    pub title: Option<String>,
    pub link: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
}

impl RawJobFields {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_employment_type(mut self, employment_type: impl Into<String>) -> Self {
        self.employment_type = Some(employment_type.into());
        self
    }
}

/// A canonical job posting produced by one scrape. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    /// Absolute `http(s)` URL without fragment.
    pub url: String,
    pub location: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
}

/// Stable identity of a job posting: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    /// Parse a fingerprint supplied by an operator or read back from storage.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let s = s.trim();
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(AppError::NotFound(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines and tables.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked job as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntity {
    pub fingerprint: Fingerprint,
    pub title: String,
    pub company: String,
    pub url: String,
    pub location: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub status: JobStatus,
    pub notes: Option<String>,
}

impl JobEntity {
    /// A freshly discovered job.
    pub fn discovered(record: &JobRecord, fingerprint: Fingerprint, at: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            title: record.title.clone(),
            company: record.company.clone(),
            url: record.url.clone(),
            location: record.location.clone(),
            department: record.department.clone(),
            employment_type: record.employment_type.clone(),
            first_seen: at,
            last_updated: at,
            status: JobStatus::New,
            notes: None,
        }
    }

    /// Apply a re-observation: refresh descriptive fields and `last_updated`.
    ///
    /// `status`, `notes` and `first_seen` are left alone. Returns the names of
    /// the descriptive fields that changed.
    pub fn observe(&mut self, record: &JobRecord, at: DateTime<Utc>) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.title != record.title {
            self.title = record.title.clone();
            changed.push("title");
        }
        if self.url != record.url {
            self.url = record.url.clone();
            changed.push("url");
        }
        if self.location != record.location {
            self.location = record.location.clone();
            changed.push("location");
        }
        if self.department != record.department {
            self.department = record.department.clone();
            changed.push("department");
        }
        if self.employment_type != record.employment_type {
            self.employment_type = record.employment_type.clone();
            changed.push("employment_type");
        }
        self.last_updated = at;
        changed
    }
}

/// One row of the append-only status ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub fingerprint: Fingerprint,
    pub status: JobStatus,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Result of [`JobStore::upsert_seen`](crate::traits::JobStore::upsert_seen).
#[derive(Debug, Clone)]
pub struct SeenOutcome {
    pub entity: JobEntity,
    /// True when this call created the entity.
    pub created: bool,
}

/// Notes recorded on the history entry written at discovery.
pub const DISCOVERED_NOTE: &str = "Job discovered by monitor";

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
