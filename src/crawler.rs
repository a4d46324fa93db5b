//! Discovery collaborator: lists candidate companies and fetches their
//! detail pages.
//!
//! Consumed once per run during the Discover stage. Per-URL fetch
//! failures are recorded on the result, never raised — a missing detail
//! page degrades that one candidate, not the run.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{DealflowError, Result};

/// Identifying UA for outbound fetches.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; DealflowBot/1.0; +https://example.com/bot)";

/// A candidate company as listed by the discovery source.
#[derive(Debug, Clone)]
pub struct CandidateListing {
    pub name: String,
    pub summary: String,
    pub source_url: Option<String>,
}

/// Result of fetching one detail page.
#[derive(Debug, Clone)]
pub struct PageDetail {
    pub url: String,
    pub full_text: Option<String>,
    pub error: Option<String>,
}

/// The crawler boundary.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// List up to `limit` candidate companies from the discovery source.
    async fn list_candidates(&self, limit: usize) -> Result<Vec<CandidateListing>>;

    /// Fetch full text for each URL. One entry per input URL, errors
    /// recorded in place.
    async fn fetch_details(&self, urls: &[String]) -> Result<Vec<PageDetail>>;
}

/// HTTP crawler against a JSON directory feed.
///
/// The listing endpoint is expected to return an array of objects with
/// `name` (or `title`), `summary`, and `url` fields; detail pages are
/// ordinary HTML reduced to text.
pub struct HttpCrawler {
    client: reqwest::Client,
    listing_url: String,
}

impl HttpCrawler {
    pub fn new(listing_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DealflowError::collaborator("crawler", format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            listing_url: listing_url.into(),
        })
    }

    fn parse_listing(value: &Value, limit: usize) -> Vec<CandidateListing> {
        let items = value
            .as_array()
            .or_else(|| value.get("items").and_then(Value::as_array))
            .cloned()
            .unwrap_or_default();

        items
            .iter()
            .filter_map(|item| {
                let name = item
                    .get("name")
                    .or_else(|| item.get("title"))
                    .and_then(Value::as_str)
                    .map(str::trim)?;
                if name.is_empty() {
                    return None;
                }
                Some(CandidateListing {
                    name: name.to_string(),
                    summary: item.get("summary").and_then(Value::as_str).unwrap_or("").to_string(),
                    source_url: item.get("url").and_then(Value::as_str).map(str::to_string),
                })
            })
            .take(limit)
            .collect()
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    async fn list_candidates(&self, limit: usize) -> Result<Vec<CandidateListing>> {
        let response = self
            .client
            .get(&self.listing_url)
            .send()
            .await
            .map_err(|e| DealflowError::collaborator("crawler", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DealflowError::collaborator("crawler", format!("listing fetch failed: {status}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| DealflowError::MalformedResponse(format!("listing is not JSON: {e}")))?;
        Ok(Self::parse_listing(&value, limit))
    }

    async fn fetch_details(&self, urls: &[String]) -> Result<Vec<PageDetail>> {
        let mut details = Vec::with_capacity(urls.len());
        for url in urls {
            let detail = match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(html) => PageDetail {
                        url: url.clone(),
                        full_text: Some(strip_tags(&html)),
                        error: None,
                    },
                    Err(e) => PageDetail {
                        url: url.clone(),
                        full_text: None,
                        error: Some(e.to_string()),
                    },
                },
                Ok(response) => PageDetail {
                    url: url.clone(),
                    full_text: None,
                    error: Some(format!("status {}", response.status())),
                },
                Err(e) => PageDetail {
                    url: url.clone(),
                    full_text: None,
                    error: Some(e.to_string()),
                },
            };
            if let Some(e) = &detail.error {
                log::warn!("detail fetch failed for {url}: {e}");
            }
            details.push(detail);
        }
        Ok(details)
    }
}

/// Reduce an HTML page to readable text: drop script/style subtrees,
/// strip remaining tags, collapse whitespace.
pub fn strip_tags(html: &str) -> String {
    static SCRIPT_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();

    let script_re = SCRIPT_RE
        .get_or_init(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").expect("static regex"));
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
    let space_re = SPACE_RE.get_or_init(|| Regex::new(r"[ \t\r\f]+").expect("static regex"));

    let without_scripts = script_re.replace_all(html, " ");
    let without_tags = tag_re.replace_all(&without_scripts, " ");
    let collapsed = space_re.replace_all(&without_tags, " ");

    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Crawler serving fixed data, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCrawler {
    pub listings: Vec<CandidateListing>,
    pub pages: HashMap<String, String>,
}

impl StaticCrawler {
    pub fn new(listings: Vec<CandidateListing>, pages: HashMap<String, String>) -> Self {
        Self { listings, pages }
    }
}

#[async_trait]
impl Crawler for StaticCrawler {
    async fn list_candidates(&self, limit: usize) -> Result<Vec<CandidateListing>> {
        Ok(self.listings.iter().take(limit).cloned().collect())
    }

    async fn fetch_details(&self, urls: &[String]) -> Result<Vec<PageDetail>> {
        Ok(urls
            .iter()
            .map(|url| match self.pages.get(url) {
                Some(text) => PageDetail {
                    url: url.clone(),
                    full_text: Some(text.clone()),
                    error: None,
                },
                None => PageDetail {
                    url: url.clone(),
                    full_text: None,
                    error: Some("page not found".to_string()),
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_tags_basic() {
        let html = "<html><body><h1>Acme</h1><p>Green delivery</p></body></html>";
        let text = strip_tags(html);
        assert!(text.contains("Acme"));
        assert!(text.contains("Green delivery"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_strip_tags_removes_script_and_style() {
        let html = "<p>Kept</p><script>var hidden = 1;</script><style>.x{color:red}</style>";
        let text = strip_tags(html);
        assert!(text.contains("Kept"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_strip_tags_collapses_whitespace() {
        let text = strip_tags("<p>a</p>   \n\n  <p>b    c</p>");
        assert_eq!(text, "a\nb c");
    }

    #[test]
    fn test_parse_listing_accepts_name_or_title() {
        let value = json!([
            {"name": "Acme", "summary": "s1", "url": "http://a"},
            {"title": "Beta", "summary": "s2"},
            {"summary": "nameless"},
            {"name": "  "}
        ]);
        let listings = HttpCrawler::parse_listing(&value, 10);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Acme");
        assert_eq!(listings[0].source_url.as_deref(), Some("http://a"));
        assert_eq!(listings[1].name, "Beta");
        assert!(listings[1].source_url.is_none());
    }

    #[test]
    fn test_parse_listing_respects_limit_and_wrapper() {
        let value = json!({"items": [{"name": "A"}, {"name": "B"}, {"name": "C"}]});
        let listings = HttpCrawler::parse_listing(&value, 2);
        assert_eq!(listings.len(), 2);
    }

    #[tokio::test]
    async fn test_static_crawler_records_missing_pages() {
        let crawler = StaticCrawler::new(
            vec![CandidateListing {
                name: "Acme".to_string(),
                summary: "s".to_string(),
                source_url: Some("http://a".to_string()),
            }],
            HashMap::from([("http://a".to_string(), "body text".to_string())]),
        );

        let listings = crawler.list_candidates(5).await.unwrap();
        assert_eq!(listings.len(), 1);

        let details = crawler
            .fetch_details(&["http://a".to_string(), "http://missing".to_string()])
            .await
            .unwrap();
        assert_eq!(details[0].full_text.as_deref(), Some("body text"));
        assert!(details[1].full_text.is_none());
        assert!(details[1].error.is_some());
    }
}
