//! Web page fetching for the `web` tool

use async_trait::async_trait;
use refact_core::{RefactError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::instrument;

/// Maximum characters of page text handed to the agent
pub const WEB_CHAR_BUDGET: usize = 5000;

/// Fetches raw page bodies (allows stubbing in tests)
#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header("user-agent", "refact")
            .send()
            .await
            .map_err(RefactError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefactError::Upstream {
                status: status.as_u16(),
                body: format!("GET {} returned {}", url, status),
            });
        }

        response.text().await.map_err(RefactError::transport)
    }
}

/// Fetcher serving fixed bodies; unknown URLs fail with 404
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl WebFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or(RefactError::Upstream {
            status: 404,
            body: format!("No page for {}", url),
        })
    }
}

/// Fetch `url` and reduce it to plain text; failures become a descriptive string
pub async fn fetch_page_text(fetcher: &dyn WebFetcher, url: &str) -> String {
    match fetcher.fetch(url).await {
        Ok(html) => extract_text(&html),
        Err(e) => {
            tracing::warn!("Web fetch of {} failed: {}", url, e);
            format!("Failed to fetch {}: {}", url, e)
        }
    }
}

fn script_style_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("script/style pattern is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Strip script/style blocks and markup, collapse whitespace, truncate to the budget
pub fn extract_text(html: &str) -> String {
    let without_code = script_style_pattern().replace_all(html, " ");
    let without_tags = tag_pattern().replace_all(&without_code, " ");
    let collapsed = whitespace_pattern().replace_all(&without_tags, " ");
    collapsed.trim().chars().take(WEB_CHAR_BUDGET).collect()
}
