//! Mock audit-log API for testing
//!
//! Serves scripted pages in order and records every requested URL.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AuditLogApi, AuditQuery, Page};
use crate::config::OrgCredential;
use crate::error::ScanError;

/// Mock API client for testing.
///
/// # Example
/// ```ignore
/// let api = MockAuditLogApi::new()
///     .with_page(Page { status: 200, body: "[]".into(), link: None });
/// ```
#[derive(Default)]
pub struct MockAuditLogApi {
    /// Responses served in order; an exhausted script answers `[]`
    responses: Mutex<VecDeque<Result<Page, ScanError>>>,
    /// URLs passed to get_page
    requested: Mutex<Vec<String>>,
    /// Organizations whose token was presented
    presented: Mutex<Vec<String>>,
}

impl MockAuditLogApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page to return from the next get_page call.
    pub fn with_page(mut self, page: Page) -> Self {
        self.responses.get_mut().push_back(Ok(page));
        self
    }

    /// Queue a successful single-page response with the given JSON body.
    pub fn with_body(self, body: &str) -> Self {
        self.with_page(Page {
            status: 200,
            body: body.to_string(),
            link: None,
        })
    }

    /// Queue a transport error for the next get_page call.
    pub fn with_error(mut self, error: ScanError) -> Self {
        self.responses.get_mut().push_back(Err(error));
        self
    }

    pub async fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requested.lock().await.len()
    }

    pub async fn presented_orgs(&self) -> Vec<String> {
        self.presented.lock().await.clone()
    }
}

#[async_trait]
impl AuditLogApi for MockAuditLogApi {
    fn audit_log_url(&self, query: &AuditQuery<'_>) -> Result<String, ScanError> {
        Ok(format!(
            "https://mock/orgs/{}/audit-log?phrase={}&include={}",
            query.org_name,
            query.window.phrase(),
            query.event_type.as_str()
        ))
    }

    async fn get_page(&self, url: &str, credential: &OrgCredential) -> Result<Page, ScanError> {
        self.requested.lock().await.push(url.to_string());
        self.presented
            .lock()
            .await
            .push(credential.org_name.clone());

        self.responses.lock().await.pop_front().unwrap_or_else(|| {
            Ok(Page {
                status: 200,
                body: "[]".to_string(),
                link: None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_script_in_order() {
        let api = MockAuditLogApi::new()
            .with_body("[1]")
            .with_error(ScanError::Connection("down".into()));
        let cred = OrgCredential::new("org", "token");

        assert_eq!(api.get_page("a", &cred).await.unwrap().body, "[1]");
        assert!(api.get_page("b", &cred).await.is_err());
        assert_eq!(api.get_page("c", &cred).await.unwrap().body, "[]");
        assert_eq!(api.request_count().await, 3);
        assert_eq!(api.presented_orgs().await, vec!["org", "org", "org"]);
    }
}
