use crate::har::Entry;
use std::collections::HashSet;
use url::Url;

/// Where a page's first request ended up after following redirects
#[derive(Debug, Clone)]
pub struct RedirectChain<'a> {
    /// Entry the chain stopped on
    pub final_entry: &'a Entry,
    /// Request URLs visited, starting with the first request and ending with
    /// `final_entry`'s
    pub urls: Vec<String>,
}

impl RedirectChain<'_> {
    pub fn final_url(&self) -> &str {
        &self.final_entry.request.url
    }

    pub fn redirects(&self) -> usize {
        self.urls.len().saturating_sub(1)
    }
}

/// Follow redirects from `entries[start]` through entries of the same page.
///
/// Stops at the first non-redirect response, at a redirect whose target was
/// never requested on the page (dead end) or when a target was already
/// visited (cycle). In the last two cases the chain ends on the last entry
/// reached.
pub fn resolve<'a>(entries: &[&'a Entry], start: usize) -> RedirectChain<'a> {
    let page_id = entries[start].page_id();
    let mut visited = HashSet::from([start]);
    let mut current = entries[start];
    let mut urls = vec![current.request.url.clone()];

    while let Some(target) = redirect_target(current) {
        let next = entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(idx, entry)| {
                !visited.contains(idx)
                    && entry.page_id() == page_id
                    && same_url(&entry.request.url, &target)
            })
            .map(|(idx, _)| idx);

        match next {
            Some(idx) => {
                visited.insert(idx);
                current = entries[idx];
                urls.push(current.request.url.clone());
            }
            None => {
                tracing::debug!(
                    "Redirect from {} to {} has no matching request",
                    current.request.url,
                    target
                );
                break;
            }
        }
    }

    RedirectChain {
        final_entry: current,
        urls,
    }
}

pub fn is_redirect(status: i64) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Absolute redirect target of a response, if it is a redirect at all.
///
/// Uses the HAR `redirectURL` and falls back to the `location` header;
/// relative targets are resolved against the request URL.
fn redirect_target(entry: &Entry) -> Option<String> {
    if !is_redirect(entry.response.status) {
        return None;
    }

    let raw = if entry.response.redirect_url.is_empty() {
        entry
            .response
            .headers
            .iter()
            .rev()
            .find(|header| header.name.eq_ignore_ascii_case("location"))
            .map(|header| header.value.as_str())?
    } else {
        entry.response.redirect_url.as_str()
    };

    if raw.trim().is_empty() {
        return None;
    }

    let resolved = Url::parse(&entry.request.url)
        .and_then(|base| base.join(raw.trim()))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| raw.trim().to_string());
    Some(resolved)
}

fn same_url(candidate: &str, target: &str) -> bool {
    candidate == target
        || Url::parse(candidate)
            .map(|url| url.as_str() == target)
            .unwrap_or(false)
}
