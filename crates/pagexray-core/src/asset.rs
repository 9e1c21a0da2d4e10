use crate::har::Entry;
use crate::headers::{self, HeaderMap};
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-type bucket an asset is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Plain,
    Css,
    Javascript,
    Json,
    Svg,
    Favicon,
    Image,
    Font,
    Flash,
    Other,
}

impl ContentType {
    /// Buckets every content-type table starts out with
    pub const DEFAULTS: [ContentType; 5] = [
        ContentType::Html,
        ContentType::Css,
        ContentType::Javascript,
        ContentType::Image,
        ContentType::Font,
    ];

    /// Classify a raw MIME type. Total: anything unmatched is `Other`.
    pub fn from_mime(mime_type: &str) -> Self {
        let parsed = mime_type.trim().parse::<Mime>().ok();
        let essence = match &parsed {
            Some(m) => m.essence_str().to_lowercase(),
            None => mime_type.trim().to_lowercase(),
        };
        let top_level = parsed
            .as_ref()
            .map(|m| m.type_().as_str().to_lowercase())
            .unwrap_or_else(|| essence.split('/').next().unwrap_or("").to_string());

        if essence.contains("html") {
            ContentType::Html
        } else if essence.contains("plain") {
            ContentType::Plain
        } else if essence.contains("css") {
            ContentType::Css
        } else if essence.contains("javascript") || essence.contains("ecmascript") {
            ContentType::Javascript
        } else if essence.contains("json") {
            ContentType::Json
        } else if essence.contains("svg") {
            ContentType::Svg
        } else if essence == "image/x-icon" || essence == "image/vnd.microsoft.icon" {
            ContentType::Favicon
        } else if top_level == mime::IMAGE.as_str() {
            ContentType::Image
        } else if top_level == mime::FONT.as_str() || essence.contains("font") {
            ContentType::Font
        } else if essence.contains("flash") {
            ContentType::Flash
        } else {
            ContentType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Plain => "plain",
            ContentType::Css => "css",
            ContentType::Javascript => "javascript",
            ContentType::Json => "json",
            ContentType::Svg => "svg",
            ContentType::Favicon => "favicon",
            ContentType::Image => "image",
            ContentType::Font => "font",
            ContentType::Flash => "flash",
            ContentType::Other => "other",
        }
    }

    /// Text formats that should be served compressed
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ContentType::Html
                | ContentType::Plain
                | ContentType::Css
                | ContentType::Javascript
                | ContentType::Json
                | ContentType::Svg
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized HTTP protocol version of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVersion {
    #[serde(rename = "HTTP/1.0")]
    Http10,
    #[serde(rename = "HTTP/1.1")]
    Http11,
    #[serde(rename = "HTTP/2.0")]
    Http2,
    #[serde(rename = "HTTP/3.0")]
    Http3,
    #[serde(rename = "SPDY")]
    Spdy,
    #[serde(rename = "unknown")]
    Unknown,
}

impl HttpVersion {
    /// Normalize the version strings browsers write into HAR files
    /// (`HTTP/1.1`, `http/2.0`, `h2`, `h3-29`, `spdy/3.1`, ...).
    pub fn parse(version: &str) -> Self {
        let lower = version.trim().to_lowercase();
        match lower.as_str() {
            "http/1.0" => HttpVersion::Http10,
            "http/1.1" => HttpVersion::Http11,
            "h2" | "http/2" | "http/2.0" => HttpVersion::Http2,
            "h3" | "http/3" | "http/3.0" => HttpVersion::Http3,
            other if other.starts_with("h3-") || other.contains("quic") => HttpVersion::Http3,
            other if other.starts_with("spdy") => HttpVersion::Spdy,
            _ => HttpVersion::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
            HttpVersion::Http2 => "HTTP/2.0",
            HttpVersion::Http3 => "HTTP/3.0",
            HttpVersion::Spdy => "SPDY",
            HttpVersion::Unknown => "unknown",
        }
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            HttpVersion::Http10 | HttpVersion::Http11 => ConnectionType::H1,
            HttpVersion::Http2 => ConnectionType::H2,
            HttpVersion::Http3 => ConnectionType::H3,
            HttpVersion::Spdy => ConnectionType::Spdy,
            HttpVersion::Unknown => ConnectionType::Unknown,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection family, reported as `httpType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    H1,
    H2,
    H3,
    Spdy,
    Unknown,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::H1 => "h1",
            ConnectionType::H2 => "h2",
            ConnectionType::H3 => "h3",
            ConnectionType::Spdy => "spdy",
            ConnectionType::Unknown => "unknown",
        }
    }
}

/// Flattened request and response headers of an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetHeaders {
    pub request: HeaderMap,
    pub response: HeaderMap,
}

/// Normalized view of one HAR entry.
///
/// Sizes are kept as reported; negative values mean "unknown" and are only
/// clamped when folded into page totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub url: String,
    pub transfer_size: i64,
    pub content_size: i64,
    pub header_size: i64,
    pub expires: f64,
    pub status: i64,
    pub time_since_last_modified: f64,
    pub http_version: HttpVersion,
    pub cookies: u64,
    pub headers: AssetHeaders,
}

impl Asset {
    /// Build the asset for `entry`. `now` is the wall-clock reference for
    /// the freshness calculations.
    pub fn extract(entry: &Entry, now: DateTime<Utc>) -> Self {
        let response = &entry.response;
        let request_headers = headers::flatten(&entry.request.headers);
        let response_headers = headers::flatten(&response.headers);

        let content_size = if response.content.size < 0 {
            response.body_size
        } else {
            response.content.size
        };

        Asset {
            content_type: ContentType::from_mime(&response.content.mime_type),
            url: entry.request.url.clone(),
            transfer_size: response.body_size,
            content_size,
            header_size: response.headers_size,
            expires: headers::expires(&response_headers, now),
            status: response.status,
            time_since_last_modified: headers::time_since_last_modified(&response_headers, now),
            http_version: HttpVersion::parse(&response.http_version),
            cookies: count_cookies(&request_headers),
            headers: AssetHeaders {
                request: request_headers,
                response: response_headers,
            },
        }
    }
}

/// Number of cookies sent with the request
fn count_cookies(request_headers: &HeaderMap) -> u64 {
    request_headers
        .get("cookie")
        .map(|cookie| {
            cookie
                .split(';')
                .filter(|pair| !pair.trim().is_empty())
                .count() as u64
        })
        .unwrap_or(0)
}
