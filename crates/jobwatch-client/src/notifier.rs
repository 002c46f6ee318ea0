use std::time::Duration;

use jobwatch_core::error::AppError;
use jobwatch_core::models::JobEntity;
use jobwatch_core::traits::Notifier;
use reqwest::Client;
use serde::Serialize;

/// Writes newly discovered jobs to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn notify(&self, source_name: &str, jobs: &[JobEntity]) -> Result<(), AppError> {
        tracing::info!(source = %source_name, count = jobs.len(), "New matching jobs");
        for job in jobs {
            tracing::info!(
                source = %source_name,
                fingerprint = %job.fingerprint.short(),
                title = %job.title,
                url = %job.url,
                location = job.location.as_deref().unwrap_or("-"),
                "New job"
            );
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    source: &'a str,
    count: usize,
    jobs: &'a [JobEntity],
}

/// POSTs newly discovered jobs as JSON to a webhook endpoint.
///
/// Body: `{"source": "...", "count": N, "jobs": [JobEntity, ...]}`.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, AppError> {
        Self::with_timeout(url, Duration::from_secs(10))
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, AppError> {
        url::Url::parse(url)
            .map_err(|e| AppError::ConfigError(format!("Invalid webhook URL '{url}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, source_name: &str, jobs: &[JobEntity]) -> Result<(), AppError> {
        let payload = WebhookPayload {
            source: source_name,
            count: jobs.len(),
            jobs,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::NotifyError(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::NotifyError(format!(
                "webhook returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        tracing::debug!(source = %source_name, count = jobs.len(), "Webhook delivered");
        Ok(())
    }
}

/// Notifier chosen at startup from configuration.
#[derive(Clone)]
pub enum ClientNotifier {
    Tracing(TracingNotifier),
    Webhook(WebhookNotifier),
}

impl ClientNotifier {
    /// Webhook when a URL is given, log output otherwise.
    pub fn from_webhook_url(url: Option<&str>) -> Result<Self, AppError> {
        match url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url)?)),
            None => Ok(Self::Tracing(TracingNotifier)),
        }
    }
}

impl Notifier for ClientNotifier {
    async fn notify(&self, source_name: &str, jobs: &[JobEntity]) -> Result<(), AppError> {
        match self {
            Self::Tracing(n) => n.notify(source_name, jobs).await,
            Self::Webhook(n) => n.notify(source_name, jobs).await,
        }
    }
}
