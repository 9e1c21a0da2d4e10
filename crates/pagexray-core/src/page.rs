use crate::asset::{Asset, ConnectionType, ContentType, HttpVersion};
use crate::stats::Summary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Byte and request counters. Every size folded in is clamped to zero first,
/// so the totals never go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTotals {
    pub transfer_size: u64,
    pub content_size: u64,
    pub header_size: u64,
    pub requests: u64,
}

impl SizeTotals {
    pub fn add(&mut self, asset: &Asset) {
        self.transfer_size += clamp(asset.transfer_size);
        self.content_size += clamp(asset.content_size);
        self.header_size += clamp(asset.header_size);
        self.requests += 1;
    }
}

/// Treat negative (unknown) sizes as zero
pub fn clamp(size: i64) -> u64 {
    size.max(0) as u64
}

pub type ContentTypeTable = BTreeMap<ContentType, SizeTotals>;

/// A content-type table holding the default buckets
pub fn seeded_content_types() -> ContentTypeTable {
    ContentType::DEFAULTS
        .iter()
        .map(|content_type| (*content_type, SizeTotals::default()))
        .collect()
}

/// First- or third-party share of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    #[serde(flatten)]
    pub totals: SizeTotals,
    pub content_types: ContentTypeTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_stats: Option<Summary>,
}

/// Everything known about one page after aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub url: String,
    pub final_url: String,
    pub base_domain: String,
    /// Redirects followed before reaching `final_url` (`redirect_chain.len() - 1`)
    pub document_redirects: usize,
    pub redirect_chain: Vec<String>,
    #[serde(flatten)]
    pub totals: SizeTotals,
    pub missing_compression: u64,
    pub http_type: ConnectionType,
    pub http_version: HttpVersion,
    pub content_types: ContentTypeTable,
    pub assets: Vec<Asset>,
    pub response_codes: BTreeMap<i64, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_party: Option<PartySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party: Option<PartySummary>,
    pub domains: BTreeMap<String, SizeTotals>,
    pub total_domains: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_stats: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_stats: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_stats: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_metrics: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Map<String, Value>>,
}

impl PageSummary {
    pub fn content_type(&self, content_type: ContentType) -> Option<&SizeTotals> {
        self.content_types.get(&content_type)
    }
}
