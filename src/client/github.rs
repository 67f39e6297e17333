//! GitHub audit-log API client implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client as HttpClient, Url};

use super::{AuditLogApi, AuditQuery, Page};
use crate::config::OrgCredential;
use crate::error::ScanError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub audit-log API client
pub struct GithubClient {
    http: HttpClient,
    base_url: String,
    page_size: u32,
}

impl GithubClient {
    /// Create a client for the given API root
    pub fn new(base_url: impl Into<String>, page_size: u32) -> Result<Self, ScanError> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScanError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            page_size,
        })
    }
}

#[async_trait]
impl AuditLogApi for GithubClient {
    fn audit_log_url(&self, query: &AuditQuery<'_>) -> Result<String, ScanError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ScanError::Connection(format!("Invalid API URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ScanError::Connection("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["orgs", query.org_name, "audit-log"]);

        url.query_pairs_mut()
            .append_pair("phrase", &query.window.phrase())
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair("order", "asc")
            .append_pair("include", query.event_type.as_str());

        Ok(url.into())
    }

    async fn get_page(&self, url: &str, credential: &OrgCredential) -> Result<Page, ScanError> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("token {}", credential.api_token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("ghaudit/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(Page { status, body, link })
    }
}
