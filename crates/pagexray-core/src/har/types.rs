use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level HAR object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Har {
    pub log: Log,
}

/// Main HAR log object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub version: String,
    pub creator: Creator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<Creator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    pub entries: Vec<Entry>,
    /// Custom fields (prefixed with `_`) written by the capturing tool
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Creator/Browser information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Page information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "startedDateTime", default)]
    pub started_date_time: String,
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "pageTimings", default)]
    pub page_timings: PageTimings,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Page {
    /// Look up a custom field such as `_SpeedIndex` or `_meta`
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }
}

/// Page timing information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageTimings {
    #[serde(rename = "onContentLoad", skip_serializing_if = "Option::is_none")]
    pub on_content_load: Option<f64>,
    #[serde(rename = "onLoad", skip_serializing_if = "Option::is_none")]
    pub on_load: Option<f64>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Individual HTTP transaction entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "pageref", skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(rename = "startedDateTime", default)]
    pub started_date_time: String,
    pub request: Request,
    pub response: Response,
}

impl Entry {
    /// Page identifier this entry belongs to; entries without one share the
    /// empty identifier.
    pub fn page_id(&self) -> &str {
        self.page_ref.as_deref().unwrap_or("")
    }
}

/// HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub method: String,
    pub url: String,
    #[serde(rename = "httpVersion", default)]
    pub http_version: String,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: i64,
    #[serde(rename = "statusText", default)]
    pub status_text: String,
    #[serde(rename = "httpVersion", default)]
    pub http_version: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub content: Content,
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: String,
    #[serde(rename = "headersSize", default = "unknown_size")]
    pub headers_size: i64,
    #[serde(rename = "bodySize", default = "unknown_size")]
    pub body_size: i64,
}

/// HTTP header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Response content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default = "unknown_size")]
    pub size: i64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            size: unknown_size(),
            mime_type: String::new(),
        }
    }
}

/// HAR uses -1 for sizes that were not recorded
fn unknown_size() -> i64 {
    -1
}
