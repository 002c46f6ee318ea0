use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::keyword::KeywordFilter;
use crate::rule::SourceConfig;

/// Monitor configuration, usually read from `config.json`.
///
/// ```json
/// {
///   "keywords": ["operation", "support"],
///   "sources": [
///     {"name": "Acme", "url": "https://boards.greenhouse.io/acme"},
///     {"name": "Globex", "url": "https://globex.test/careers",
///      "selectors": {"job_container": "li.job", "title": "h3", "link": "a"}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub sources: Vec<SourceConfig>,
    /// How many sources are scraped at once within a run.
    #[serde(default = "default_max_concurrent_sources")]
    pub max_concurrent_sources: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Endpoint receiving new-job notifications as JSON (optional).
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_max_concurrent_sources() -> usize {
    1
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl MonitorConfig {
    /// Read and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: MonitorConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            keywords = ?config.keywords,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.sources.is_empty() {
            return Err(AppError::ConfigError(
                "at least one source must be configured".into(),
            ));
        }
        if self.max_concurrent_sources == 0 {
            return Err(AppError::ConfigError(
                "max_concurrent_sources must be at least 1".into(),
            ));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.trim().to_lowercase()) {
                return Err(AppError::ConfigError(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }

    pub fn keyword_filter(&self) -> KeywordFilter {
        KeywordFilter::new(&self.keywords)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
