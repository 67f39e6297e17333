//! Link-header pagination
//!
//! A query is walked by following `rel="next"` links until a response
//! carries none. Running out of links is the normal end of a query, never an
//! error.

use futures::Stream;
use futures::stream;
use log::{debug, warn};
use regex::Regex;

use super::{AuditLogApi, Page};
use crate::config::OrgCredential;
use crate::error::ScanError;
use crate::LOG_TARGET;

/// Matches `<URL>; rel="next"` inside an RFC 5988 `Link` header
pub const NEXT_LINK_PATTERN: &str = r#"<(\S+)>;\s*rel="next""#;

/// Extracts the next-page URL from a `Link` header.
pub struct NextLinkParser {
    pattern: Result<Regex, regex::Error>,
}

impl Default for NextLinkParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NextLinkParser {
    pub fn new() -> Self {
        Self::with_pattern(NEXT_LINK_PATTERN)
    }

    /// Build a parser from a custom pattern. Capture group 1 is the URL.
    pub fn with_pattern(pattern: &str) -> Self {
        Self {
            pattern: Regex::new(pattern),
        }
    }

    /// Return the next-page URL, or `None` when pagination is over.
    pub fn next_page(&self, header: Option<&str>) -> Option<String> {
        let regex = match &self.pattern {
            Ok(regex) => regex,
            Err(e) => {
                warn!(target: LOG_TARGET, "Cannot compile regex");
                debug!(target: LOG_TARGET, "Regex error: {}", e);
                return None;
            }
        };

        let Some(captures) = header.and_then(|h| regex.captures(h)) else {
            debug!(target: LOG_TARGET, "No match regex.");
            return None;
        };

        match captures.get(1).map(|m| m.as_str()) {
            Some(url) if !url.is_empty() => Some(url.to_string()),
            _ => {
                debug!(target: LOG_TARGET, "No next page was captured.");
                None
            }
        }
    }
}

/// Lazily walk every page of a query, starting at `first_url`.
///
/// Each item is one fetched page. The stream ends after the first page whose
/// `Link` header has no next target, or after the first transport error.
pub fn pages<'a>(
    api: &'a dyn AuditLogApi,
    credential: &'a OrgCredential,
    links: &'a NextLinkParser,
    first_url: String,
) -> impl Stream<Item = Result<Page, ScanError>> + Send + 'a {
    stream::try_unfold(Some(first_url), move |next| async move {
        let Some(url) = next else {
            return Ok(None);
        };

        debug!(target: LOG_TARGET, "Fetching '{}'", url);
        let page = api.get_page(&url, credential).await?;
        let next = links.next_page(page.link.as_deref()).filter(|next| {
            let repeated = *next == url;
            if repeated {
                debug!(target: LOG_TARGET, "Next page points back to '{}', stopping", url);
            }
            !repeated
        });
        Ok::<_, ScanError>(Some((page, next)))
    })
}
