use std::time::Duration;

use jobwatch_core::error::AppError;
use jobwatch_core::traits::Fetcher;
use reqwest::Client;
use url::Url;

/// HTTP fetcher using reqwest.
///
/// Downloads listing pages with a fixed User-Agent and a per-request timeout.
/// Transport failures, timeouts and non-2xx statuses all surface as
/// [`AppError::FetchError`] naming the URL.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("Jobwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let parsed = Url::parse(url).map_err(|e| AppError::fetch(url, format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::fetch(
                url,
                format!("scheme '{}' is not allowed (only http/https)", parsed.scheme()),
            ));
        }

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::fetch(url, format!("timed out after {}s", self.timeout_secs))
            } else if e.is_connect() {
                AppError::fetch(url, format!("connection failed: {e}"))
            } else {
                AppError::fetch(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::fetch(url, format!("failed to read response body: {e}")))
    }
}
