pub mod config;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod keyword;
pub mod lifecycle;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod rule;
pub mod status;
pub mod store;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::MonitorConfig;
pub use diff::{BatchAborted, BatchOutcome, DiffEngine};
pub use error::AppError;
pub use fingerprint::{fingerprint, fingerprint_with};
pub use keyword::KeywordFilter;
pub use lifecycle::StatusLifecycle;
pub use models::{
    DISCOVERED_NOTE, Fingerprint, JobEntity, JobRecord, RawJobFields, SeenOutcome,
    StatusHistoryEntry, compute_hash,
};
pub use monitor::{
    JobMonitor, MonitorEvent, MonitorReporter, RunReport, SourceOutcome, SourceResult,
    TracingMonitorReporter,
};
pub use normalize::normalize;
pub use rule::{ExtractionRule, FingerprintMode, Platform, SourceConfig};
pub use status::JobStatus;
pub use store::MemoryJobStore;
pub use traits::{Fetcher, JobStore, Notifier, PageExtractor};
