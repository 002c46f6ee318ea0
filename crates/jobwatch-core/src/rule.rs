//! Data-driven extraction rules.
//!
//! Every source resolves to an [`ExtractionRule`]: either the selectors given
//! in its configuration, or the preset of the hosting [`Platform`] (named
//! explicitly or detected from the URL), or a generic fallback.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// CSS selectors locating job fields inside a listing page.
///
/// `title`, `link` and the optional field selectors are evaluated relative to
/// each element matched by `job_container`. An empty `title` or `link`
/// selector means "the container element itself".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub job_container: String,
    pub title: String,
    pub link: String,
    /// Attribute holding the posting URL on the link element.
    #[serde(default = "default_link_attribute")]
    pub link_attribute: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employment_type: Option<String>,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

impl ExtractionRule {
    pub fn new(
        job_container: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            job_container: job_container.into(),
            title: title.into(),
            link: link.into(),
            link_attribute: default_link_attribute(),
            location: None,
            department: None,
            employment_type: None,
        }
    }

    pub fn with_location(mut self, selector: impl Into<String>) -> Self {
        self.location = Some(selector.into());
        self
    }

    pub fn with_department(mut self, selector: impl Into<String>) -> Self {
        self.department = Some(selector.into());
        self
    }

    pub fn with_employment_type(mut self, selector: impl Into<String>) -> Self {
        self.employment_type = Some(selector.into());
        self
    }

    /// Rule used when a source names no selectors and no known platform.
    pub fn generic() -> Self {
        Self::new(
            r#".job, .position, .opening, .posting, [class*="job"], [class*="position"]"#,
            "h1, h2, h3, h4, .title, .job-title, .position-title, a",
            "a",
        )
    }
}

/// Hosted applicant-tracking platforms with a known page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Lever,
    Greenhouse,
    Ashby,
    Workday,
    #[serde(alias = "bamboo")]
    BambooHr,
}

impl Platform {
    /// Guess the platform from the host of a careers page URL.
    pub fn detect(url: &str) -> Option<Self> {
        let parsed = url::Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if on("lever.co") {
            Some(Platform::Lever)
        } else if on("greenhouse.io") {
            Some(Platform::Greenhouse)
        } else if on("ashbyhq.com") {
            Some(Platform::Ashby)
        } else if on("myworkdayjobs.com") || on("myworkdaysite.com") || on("workday.com") {
            Some(Platform::Workday)
        } else if on("bamboohr.com") {
            Some(Platform::BambooHr)
        } else {
            None
        }
    }

    pub fn rule(&self) -> ExtractionRule {
        match self {
            Platform::Lever => ExtractionRule::new(".posting", ".posting-name, h5", "a.posting-title")
                .with_location(".posting-categories .location")
                .with_department(".posting-categories .department")
                .with_employment_type(".posting-categories .commitment"),
            Platform::Greenhouse => ExtractionRule::new(".opening", "a", "a")
                .with_location(".location")
                .with_department(".department"),
            Platform::Ashby => ExtractionRule::new(".job-posting", "h3, a", "a"),
            Platform::Workday => ExtractionRule::new(".job-result", "h3, a", "a"),
            Platform::BambooHr => ExtractionRule::new(".job-listing", "h3, a", "a"),
        }
    }
}

/// Which fields anchor a source's fingerprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
    /// Company, title and URL.
    #[default]
    TitleUrl,
    /// Company and title only, for sites that rotate posting IDs in URLs.
    TitleOnly,
}

/// One employer's listing page plus how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name, also used as the company on every record.
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub selectors: Option<ExtractionRule>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub fingerprint: FingerprintMode,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, rule: ExtractionRule) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selectors: Some(rule),
            platform: None,
            fingerprint: FingerprintMode::default(),
        }
    }

    pub fn with_fingerprint(mut self, mode: FingerprintMode) -> Self {
        self.fingerprint = mode;
        self
    }

    /// Resolve the rule: explicit selectors, then platform, then URL detection.
    pub fn rule(&self) -> ExtractionRule {
        if let Some(rule) = &self.selectors {
            return rule.clone();
        }
        match self.platform.or_else(|| Platform::detect(&self.url)) {
            Some(platform) => {
                tracing::debug!(source = %self.name, ?platform, "Using platform preset selectors");
                platform.rule()
            }
            None => {
                tracing::warn!(source = %self.name, "No selectors configured, using generic rule");
                ExtractionRule::generic()
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::ConfigError("source name must not be empty".into()));
        }
        if self.url.trim().is_empty() {
            return Err(AppError::ConfigError(format!(
                "source '{}' has no url",
                self.name
            )));
        }
        url::Url::parse(&self.url).map_err(|e| {
            AppError::ConfigError(format!("source '{}' has invalid url: {e}", self.name))
        })?;
        if let Some(rule) = &self.selectors {
            if rule.job_container.trim().is_empty() {
                return Err(AppError::ConfigError(format!(
                    "source '{}' has an empty job_container selector",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
