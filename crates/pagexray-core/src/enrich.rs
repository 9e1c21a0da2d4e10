//! Copy tool-specific page metrics from the HAR into page summaries.
//!
//! Which tool wrote the HAR is decided once per document by [`HarSource::detect`];
//! at most one enricher runs.

use crate::har::{Har, Page};
use crate::page::PageSummary;
use serde_json::{Map, Value};

const WEBPAGETEST_CREATOR: &str = "WebPagetest";
const CPU_PREFIX: &str = "_cpu.";

/// Tool that produced a HAR document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarSource {
    WebPageTest,
    Browsertime,
    Unknown,
}

impl HarSource {
    pub fn detect(har: &Har) -> Self {
        if har.log.creator.name == WEBPAGETEST_CREATOR {
            return HarSource::WebPageTest;
        }

        let has_meta = har
            .log
            .pages
            .as_ref()
            .and_then(|pages| pages.first())
            .is_some_and(|page| page.extension("_meta").is_some());
        if has_meta {
            return HarSource::Browsertime;
        }

        HarSource::Unknown
    }

    pub fn enricher(&self) -> Box<dyn MetricsEnricher> {
        match self {
            HarSource::WebPageTest => Box::new(WebPageTestEnricher),
            HarSource::Browsertime => Box::new(BrowsertimeEnricher),
            HarSource::Unknown => Box::new(NoopEnricher),
        }
    }
}

pub trait MetricsEnricher {
    /// Attach metrics read from `har_page` to the matching summary
    fn enrich_page(&self, har_page: &Page, summary: &mut PageSummary);
}

/// Visual metrics and CPU breakdown from WebPageTest's `_`-prefixed page fields
pub struct WebPageTestEnricher;

impl MetricsEnricher for WebPageTestEnricher {
    fn enrich_page(&self, har_page: &Page, summary: &mut PageSummary) {
        let mut visual_metrics = Map::new();
        let fields = [
            ("LastVisualChange", har_page.extension("_lastVisualChange")),
            ("SpeedIndex", har_page.extension("_SpeedIndex")),
            (
                "FirstVisualChange",
                har_page.page_timings.extensions.get("_startRender"),
            ),
            ("VisualComplete85", har_page.extension("_visualComplete85")),
        ];
        for (name, value) in fields {
            if let Some(value) = value
                && is_set(value)
            {
                visual_metrics.insert(name.to_string(), value.clone());
            }
        }

        let cpu: Map<String, Value> = har_page
            .extensions
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(CPU_PREFIX)
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();

        summary.visual_metrics = Some(visual_metrics);
        summary.cpu = Some(cpu);
    }
}

/// Zero, empty and `null` values mean the metric was not measured
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(set) => *set,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Browsertime keeps its metrics in `_visualMetrics` and `_cpu` objects
pub struct BrowsertimeEnricher;

impl MetricsEnricher for BrowsertimeEnricher {
    fn enrich_page(&self, har_page: &Page, summary: &mut PageSummary) {
        if let Some(Value::Object(visual_metrics)) = har_page.extension("_visualMetrics") {
            summary.visual_metrics = Some(visual_metrics.clone());
        }
        if let Some(Value::Object(cpu)) = har_page.extension("_cpu") {
            summary.cpu = Some(cpu.clone());
        }
    }
}

pub struct NoopEnricher;

impl MetricsEnricher for NoopEnricher {
    fn enrich_page(&self, _har_page: &Page, _summary: &mut PageSummary) {}
}

/// Run the enricher matching `har`'s producer over `pages`.
///
/// HAR pages and summaries are paired by index; surplus items on either
/// side are left alone.
pub fn enrich(har: &Har, pages: &mut [PageSummary]) -> HarSource {
    let source = HarSource::detect(har);
    tracing::debug!("Detected HAR source: {:?}", source);

    let enricher = source.enricher();
    if let Some(har_pages) = &har.log.pages {
        for (har_page, summary) in har_pages.iter().zip(pages.iter_mut()) {
            enricher.enrich_page(har_page, summary);
        }
    }

    source
}
