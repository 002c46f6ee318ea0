use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Application status of a tracked job.
///
/// The lifecycle is advisory: `new → applied → interviewed → {offered, rejected}`,
/// with `withdrawn` reachable from anywhere. Any recognized status can be set
/// at any time, including reopening a rejected job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    New,
    Applied,
    Interviewed,
    Offered,
    Rejected,
    Withdrawn,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::New,
        JobStatus::Applied,
        JobStatus::Interviewed,
        JobStatus::Offered,
        JobStatus::Rejected,
        JobStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Applied => "applied",
            JobStatus::Interviewed => "interviewed",
            JobStatus::Offered => "offered",
            JobStatus::Rejected => "rejected",
            JobStatus::Withdrawn => "withdrawn",
        }
    }

    /// Whether moving from `self` to `next` follows the usual path.
    ///
    /// Off-path moves are still allowed; this only feeds logging.
    pub fn is_expected_successor(&self, next: JobStatus) -> bool {
        if next == JobStatus::Withdrawn {
            return *self != JobStatus::Withdrawn;
        }
        matches!(
            (self, next),
            (JobStatus::New, JobStatus::Applied)
                | (JobStatus::Applied, JobStatus::Interviewed)
                | (JobStatus::Interviewed, JobStatus::Offered)
                | (JobStatus::Interviewed, JobStatus::Rejected)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(JobStatus::New),
            "applied" => Ok(JobStatus::Applied),
            "interviewed" => Ok(JobStatus::Interviewed),
            "offered" => Ok(JobStatus::Offered),
            "rejected" => Ok(JobStatus::Rejected),
            "withdrawn" => Ok(JobStatus::Withdrawn),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }
}
