use url::Url;

use crate::error::AppError;
use crate::models::{JobRecord, RawJobFields};

/// Trim and collapse every whitespace run (including newlines) to one space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(collapse_whitespace).filter(|v| !v.is_empty())
}

/// Resolve `link` against `base_url` into an absolute `http(s)` URL without fragment.
pub fn resolve_link(link: &str, base_url: &str) -> Result<String, AppError> {
    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url)
            .and_then(|base| base.join(link))
            .map_err(|e| {
                AppError::IncompleteRecord(format!(
                    "cannot resolve link '{link}' against '{base_url}': {e}"
                ))
            })?,
        Err(e) => {
            return Err(AppError::IncompleteRecord(format!(
                "invalid link '{link}': {e}"
            )));
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::IncompleteRecord(format!(
            "link '{link}' is not an http(s) URL"
        )));
    }
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Turn raw extracted text into a canonical [`JobRecord`].
///
/// Fails with [`AppError::IncompleteRecord`] when the title or link is empty
/// after trimming, or the link does not resolve to an `http(s)` URL.
pub fn normalize(raw: &RawJobFields, company: &str, base_url: &str) -> Result<JobRecord, AppError> {
    let title = non_empty(raw.title.as_deref())
        .ok_or_else(|| AppError::IncompleteRecord("missing title".into()))?;
    let link = non_empty(raw.link.as_deref())
        .ok_or_else(|| AppError::IncompleteRecord(format!("missing link for '{title}'")))?;

    Ok(JobRecord {
        url: resolve_link(&link, base_url)?,
        title,
        company: collapse_whitespace(company),
        location: non_empty(raw.location.as_deref()),
        department: non_empty(raw.department.as_deref()),
        employment_type: non_empty(raw.employment_type.as_deref()),
    })
}
