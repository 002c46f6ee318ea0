use jobwatch_core::error::AppError;
use jobwatch_core::models::RawJobFields;
use jobwatch_core::rule::ExtractionRule;
use jobwatch_core::traits::PageExtractor;
use scraper::{ElementRef, Html, Selector};

/// Applies CSS-selector extraction rules to listing pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorExtractor;

impl SelectorExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// An [`ExtractionRule`] with every selector parsed.
struct CompiledRule<'r> {
    container: Selector,
    /// `None` selects the container itself.
    title: Option<Selector>,
    link: Option<Selector>,
    link_attribute: &'r str,
    location: Option<Selector>,
    department: Option<Selector>,
    employment_type: Option<Selector>,
}

impl<'r> CompiledRule<'r> {
    fn compile(rule: &'r ExtractionRule) -> Result<Self, AppError> {
        Ok(Self {
            container: parse_selector("job_container", &rule.job_container)?
                .ok_or_else(|| AppError::ExtractionError("job_container selector is empty".into()))?,
            title: parse_selector("title", &rule.title)?,
            link: parse_selector("link", &rule.link)?,
            link_attribute: &rule.link_attribute,
            location: parse_optional("location", rule.location.as_deref())?,
            department: parse_optional("department", rule.department.as_deref())?,
            employment_type: parse_optional("employment_type", rule.employment_type.as_deref())?,
        })
    }

    fn apply(&self, container: ElementRef<'_>) -> RawJobFields {
        let title = match &self.title {
            Some(sel) => container.select(sel).find_map(element_text),
            None => element_text(container),
        };
        let link = match &self.link {
            Some(sel) => container
                .select(sel)
                .find_map(|el| attribute(el, self.link_attribute)),
            None => attribute(container, self.link_attribute),
        };

        RawJobFields {
            title,
            link,
            location: self.field(container, &self.location),
            department: self.field(container, &self.department),
            employment_type: self.field(container, &self.employment_type),
        }
    }

    fn field(&self, container: ElementRef<'_>, selector: &Option<Selector>) -> Option<String> {
        selector
            .as_ref()
            .and_then(|sel| container.select(sel).find_map(element_text))
    }
}

fn parse_selector(field: &str, selector: &str) -> Result<Option<Selector>, AppError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Ok(None);
    }
    Selector::parse(selector)
        .map(Some)
        .map_err(|e| AppError::ExtractionError(format!("invalid {field} selector '{selector}': {e}")))
}

fn parse_optional(field: &str, selector: Option<&str>) -> Result<Option<Selector>, AppError> {
    match selector {
        Some(s) => parse_selector(field, s),
        None => Ok(None),
    }
}

/// Concatenated text of an element, `None` when only whitespace.
fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn attribute(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PageExtractor for SelectorExtractor {
    fn extract(&self, html: &str, rule: &ExtractionRule) -> Result<Vec<RawJobFields>, AppError> {
        let compiled = CompiledRule::compile(rule)?;
        let document = Html::parse_document(html);

        let fields: Vec<RawJobFields> = document
            .select(&compiled.container)
            .map(|container| compiled.apply(container))
            .collect();

        tracing::debug!(
            containers = fields.len(),
            selector = %rule.job_container,
            "Applied extraction rule"
        );
        Ok(fields)
    }
}
