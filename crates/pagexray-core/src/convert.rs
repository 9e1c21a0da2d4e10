//! Group HAR entries into pages and fold them into page summaries.

use crate::asset::{Asset, HttpVersion};
use crate::enrich;
use crate::har::{Entry, Har};
use crate::page::{
    ContentTypeTable, PageSummary, PartySummary, SizeTotals, clamp, seeded_content_types,
};
use crate::party::FirstPartyPattern;
use crate::redirect::{self, RedirectChain};
use crate::stats::OrderStatistics;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// Text responses above this many bytes should be compressed
const COMPRESSION_THRESHOLD: u64 = 2000;

/// Options for [`convert`]
#[derive(Debug, Clone, Default)]
pub struct ConvertConfig {
    /// Keep every asset on its page instead of only the rollups
    pub include_assets: bool,
    /// Split assets into first and third party. When unset the pattern is
    /// read from `log.pages[0]._meta.firstParty` if the HAR carries one.
    pub first_party: Option<FirstPartyPattern>,
    /// Wall-clock reference for expiry and last-modified ages; defaults to
    /// the system clock
    pub now: Option<DateTime<Utc>>,
}

impl ConvertConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_assets(mut self, include_assets: bool) -> Self {
        self.include_assets = include_assets;
        self
    }

    pub fn with_first_party(mut self, pattern: &str) -> Result<Self> {
        self.first_party = Some(FirstPartyPattern::parse(pattern)?);
        Ok(self)
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Convert a HAR document into one summary per page, in the order pages are
/// first seen when walking entries by start time.
pub fn convert(har: &Har, config: &ConvertConfig) -> Result<Vec<PageSummary>> {
    if har.log.pages.as_ref().is_none_or(|pages| pages.is_empty()) {
        return Err(Error::InvalidStructure(
            "HAR log declares no pages".to_string(),
        ));
    }

    let now = config.now.unwrap_or_else(Utc::now);
    let first_party = config
        .first_party
        .clone()
        .or_else(|| first_party_from_meta(har));

    let entries = sorted_entries(har);
    tracing::debug!("Aggregating {} entries", entries.len());

    let mut page_index: HashMap<&str, usize> = HashMap::new();
    let mut builders: Vec<PageBuilder> = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        let idx = match page_index.get(entry.page_id()) {
            Some(idx) => *idx,
            None => {
                let chain = redirect::resolve(&entries, position);
                tracing::debug!(
                    "Opening page '{}' for {} ({} redirects)",
                    entry.page_id(),
                    chain.final_url(),
                    chain.redirects()
                );
                builders.push(PageBuilder::open(entry, chain));
                page_index.insert(entry.page_id(), builders.len() - 1);
                builders.len() - 1
            }
        };

        let asset = Asset::extract(entry, now);
        builders[idx].fold(asset, first_party.as_ref());
    }

    let mut pages: Vec<PageSummary> = builders
        .into_iter()
        .map(|builder| builder.finish(config.include_assets, first_party.is_some()))
        .collect();

    enrich::enrich(har, &mut pages);

    tracing::info!(
        "Converted {} entries into {} pages",
        entries.len(),
        pages.len()
    );

    Ok(pages)
}

/// Entries ordered by `startedDateTime`. Timestamps that do not parse sort
/// first; ties keep their input order.
fn sorted_entries(har: &Har) -> Vec<&Entry> {
    let mut entries: Vec<&Entry> = har.log.entries.iter().collect();
    entries.sort_by_key(|entry| started_at(entry));
    entries
}

fn started_at(entry: &Entry) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&entry.started_date_time).ok()
}

fn first_party_from_meta(har: &Har) -> Option<FirstPartyPattern> {
    let page = har.log.pages.as_ref()?.first()?;
    let pattern = match page.extension("_meta")?.get("firstParty")? {
        Value::String(pattern) => pattern,
        _ => return None,
    };

    match FirstPartyPattern::parse(pattern) {
        Ok(pattern) => {
            tracing::debug!("Using first-party pattern from HAR metadata: {}", pattern.as_str());
            Some(pattern)
        }
        Err(e) => {
            tracing::warn!("Ignoring first-party pattern from HAR metadata: {}", e);
            None
        }
    }
}

fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn is_missing_compression(asset: &Asset) -> bool {
    asset.status == 200
        && asset.content_type.is_text()
        && clamp(asset.transfer_size) > COMPRESSION_THRESHOLD
        && !asset.headers.response.contains_key("content-encoding")
}

/// Running totals of one side of the first/third-party split
struct PartyBuilder {
    totals: SizeTotals,
    content_types: ContentTypeTable,
    cookie_stats: OrderStatistics,
}

impl PartyBuilder {
    fn new() -> Self {
        Self {
            totals: SizeTotals::default(),
            content_types: seeded_content_types(),
            cookie_stats: OrderStatistics::new(),
        }
    }

    fn fold(&mut self, asset: &Asset) {
        self.totals.add(asset);
        self.cookie_stats.add(asset.cookies as f64);
        if asset.status == 200 {
            self.content_types
                .entry(asset.content_type)
                .or_default()
                .add(asset);
        }
    }

    fn finish(self) -> PartySummary {
        PartySummary {
            totals: self.totals,
            content_types: self.content_types,
            cookie_stats: self.cookie_stats.summarize(),
        }
    }
}

/// A page while entries are still being folded into it
struct PageBuilder {
    url: String,
    final_url: String,
    redirect_chain: Vec<String>,
    http_version: HttpVersion,
    totals: SizeTotals,
    missing_compression: u64,
    content_types: ContentTypeTable,
    assets: Vec<Asset>,
    response_codes: BTreeMap<i64, u64>,
    domains: BTreeMap<String, SizeTotals>,
    first_party: PartyBuilder,
    third_party: PartyBuilder,
    expire_stats: OrderStatistics,
    last_modified_stats: OrderStatistics,
    cookie_stats: OrderStatistics,
}

impl PageBuilder {
    /// Start a page from its first entry; protocol details come from the
    /// entry the redirect chain ended on.
    fn open(entry: &Entry, chain: RedirectChain<'_>) -> Self {
        let http_version = HttpVersion::parse(&chain.final_entry.response.http_version);

        Self {
            url: entry.request.url.clone(),
            final_url: chain.final_url().to_string(),
            redirect_chain: chain.urls,
            http_version,
            totals: SizeTotals::default(),
            missing_compression: 0,
            content_types: seeded_content_types(),
            assets: Vec::new(),
            response_codes: BTreeMap::new(),
            domains: BTreeMap::new(),
            first_party: PartyBuilder::new(),
            third_party: PartyBuilder::new(),
            expire_stats: OrderStatistics::new(),
            last_modified_stats: OrderStatistics::new(),
            cookie_stats: OrderStatistics::new(),
        }
    }

    fn fold(&mut self, asset: Asset, first_party: Option<&FirstPartyPattern>) {
        self.expire_stats.add(asset.expires);
        if asset.time_since_last_modified != -1.0 {
            self.last_modified_stats.add(asset.time_since_last_modified);
        }
        self.cookie_stats.add(asset.cookies as f64);

        self.domains
            .entry(hostname(&asset.url))
            .or_default()
            .add(&asset);

        *self.response_codes.entry(asset.status).or_insert(0) += 1;

        // Only successful responses count towards the content-type rollup
        if asset.status == 200 {
            self.content_types
                .entry(asset.content_type)
                .or_default()
                .add(&asset);
        }

        if is_missing_compression(&asset) {
            self.missing_compression += 1;
        }

        self.totals.add(&asset);

        if let Some(pattern) = first_party {
            if pattern.matches(&asset.url) {
                self.first_party.fold(&asset);
            } else {
                self.third_party.fold(&asset);
            }
        }

        self.assets.push(asset);
    }

    fn finish(self, include_assets: bool, split_parties: bool) -> PageSummary {
        let (first_party, third_party) = if split_parties {
            (Some(self.first_party.finish()), Some(self.third_party.finish()))
        } else {
            (None, None)
        };

        PageSummary {
            base_domain: hostname(&self.final_url),
            url: self.url,
            final_url: self.final_url,
            document_redirects: self.redirect_chain.len().saturating_sub(1),
            redirect_chain: self.redirect_chain,
            totals: self.totals,
            missing_compression: self.missing_compression,
            http_type: self.http_version.connection_type(),
            http_version: self.http_version,
            content_types: self.content_types,
            assets: if include_assets { self.assets } else { Vec::new() },
            response_codes: self.response_codes,
            first_party,
            third_party,
            total_domains: self.domains.len(),
            domains: self.domains,
            expire_stats: self.expire_stats.summarize(),
            last_modified_stats: self.last_modified_stats.summarize(),
            cookie_stats: self.cookie_stats.summarize(),
            visual_metrics: None,
            cpu: None,
        }
    }
}
