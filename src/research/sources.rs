//! Web data sources
//!
//! Each source turns a query into [`SourceItem`]s tagged with the
//! expected-source category it counts towards. Response parsing is kept
//! in free functions so it can be tested without the network.

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

use super::types::SourceItem;
use crate::config::{ConnectorsConfig, SourceKind};
use crate::constants::{network, sources};
use crate::types::utils::{collapse_whitespace, json_string, strip_html, truncate_chars};
use crate::types::{ResearchError, Result};

/// Wikipedia only contributes its best few matches
const WIKIPEDIA_TOP_RESULTS: usize = 3;

#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Expected-source category this source counts towards
    fn category(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>>;
}

pub type SharedSource = Arc<dyn DataSource>;

/// HTTP client shared by all data sources
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(sources::USER_AGENT)
        .timeout(Duration::from_secs(network::DEFAULT_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| ResearchError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Build one source by kind
pub fn create_source(
    kind: SourceKind,
    client: reqwest::Client,
    config: &ConnectorsConfig,
) -> SharedSource {
    match kind {
        SourceKind::Wikipedia => Arc::new(WikipediaSource::new(client)),
        SourceKind::Arxiv => Arc::new(ArxivSource::new(client)),
        SourceKind::News => Arc::new(NewsSource::from_env(client, &config.news_api_key_env)),
    }
}

async fn fetch(request: reqwest::RequestBuilder, source: &str) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| ResearchError::Collection(format!("{} request failed: {}", source, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResearchError::Collection(format!(
            "{} returned HTTP {}",
            source,
            status.as_u16()
        )));
    }
    Ok(response)
}

// =============================================================================
// Wikipedia
// =============================================================================

pub struct WikipediaSource {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: sources::WIKIPEDIA_API.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DataSource for WikipediaSource {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn category(&self) -> &str {
        "web"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let limit = max_results.min(WIKIPEDIA_TOP_RESULTS).to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("action", "query"),
            ("list", "search"),
            ("format", "json"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
        ]);

        let body: Value = fetch(request, self.name())
            .await?
            .json()
            .await
            .map_err(|e| ResearchError::Collection(format!("wikipedia: invalid JSON: {}", e)))?;

        let items = parse_wikipedia(&body, max_results.min(WIKIPEDIA_TOP_RESULTS))?;
        debug!("wikipedia returned {} items for {:?}", items.len(), query);
        Ok(items)
    }
}

/// Parse a MediaWiki `list=search` response
pub fn parse_wikipedia(body: &Value, limit: usize) -> Result<Vec<SourceItem>> {
    if let Some(err) = body.get("error") {
        let info = json_string(err, "info").unwrap_or_else(|| "unknown error".to_string());
        return Err(ResearchError::Collection(format!("wikipedia: {}", info)));
    }

    let hits = body
        .pointer("/query/search")
        .and_then(Value::as_array)
        .ok_or_else(|| ResearchError::Collection("wikipedia: missing search results".into()))?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let title = json_string(hit, "title")?;
            let snippet = json_string(hit, "snippet").unwrap_or_default();
            Some(SourceItem {
                source: "wikipedia".to_string(),
                category: "web".to_string(),
                url: Some(format!(
                    "https://en.wikipedia.org/wiki/{}",
                    title.replace(' ', "_")
                )),
                snippet: truncate_chars(&strip_html(&snippet), sources::SNIPPET_MAX_CHARS),
                title,
            })
        })
        .take(limit)
        .collect())
}

// =============================================================================
// arXiv
// =============================================================================

static ARXIV_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("static regex"));
static ARXIV_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("static regex"));
static ARXIV_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<summary[^>]*>(.*?)</summary>").expect("static regex"));
static ARXIV_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id>(.*?)</id>").expect("static regex"));
static ARXIV_AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("static regex"));

pub struct ArxivSource {
    client: reqwest::Client,
    endpoint: String,
}

impl ArxivSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: sources::ARXIV_API.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DataSource for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn category(&self) -> &str {
        "academic"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let search_query = format!("all:{}", query);
        let max = max_results.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("search_query", search_query.as_str()),
            ("start", "0"),
            ("max_results", max.as_str()),
        ]);

        let body = fetch(request, self.name())
            .await?
            .text()
            .await
            .map_err(|e| ResearchError::Collection(format!("arxiv: unreadable body: {}", e)))?;

        let items = parse_arxiv(&body, max_results);
        debug!("arxiv returned {} items for {:?}", items.len(), query);
        Ok(items)
    }
}

/// First capture group as plain text, with entities decoded
fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| strip_html(m.as_str()))
}

/// Parse an arXiv Atom feed; entries without a title are skipped
pub fn parse_arxiv(feed: &str, limit: usize) -> Vec<SourceItem> {
    ARXIV_ENTRY
        .captures_iter(feed)
        .filter_map(|entry| {
            let entry = entry.get(1)?.as_str();
            let title = capture(&ARXIV_TITLE, entry)?;
            let summary = capture(&ARXIV_SUMMARY, entry).unwrap_or_default();
            let authors: Vec<String> = ARXIV_AUTHOR
                .captures_iter(entry)
                .filter_map(|c| c.get(1).map(|m| strip_html(m.as_str())))
                .collect();

            let snippet = if authors.is_empty() {
                summary
            } else {
                format!("{}. {}", authors.join(", "), summary)
            };

            Some(SourceItem {
                source: "arxiv".to_string(),
                category: "academic".to_string(),
                title,
                snippet: truncate_chars(&snippet, sources::SNIPPET_MAX_CHARS),
                url: capture(&ARXIV_ID, entry),
            })
        })
        .take(limit)
        .collect()
}

// =============================================================================
// News
// =============================================================================

pub struct NewsSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    key_env: String,
}

impl NewsSource {
    pub fn new(client: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            endpoint: sources::NEWS_API.to_string(),
            api_key,
            key_env: "NEWS_API_KEY".to_string(),
        }
    }

    /// Read the API key from `key_env`; a missing key fails at search time
    pub fn from_env(client: reqwest::Client, key_env: &str) -> Self {
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        Self {
            key_env: key_env.to_string(),
            ..Self::new(client, api_key)
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl DataSource for NewsSource {
    fn name(&self) -> &str {
        "news"
    }

    fn category(&self) -> &str {
        "reports"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ResearchError::Collection(format!("news: {} is not set", self.key_env))
        })?;

        let page_size = max_results.min(sources::NEWS_MAX_PAGE_SIZE).to_string();
        let request = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", key.expose_secret())
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", page_size.as_str()),
            ]);

        let body: Value = fetch(request, self.name())
            .await?
            .json()
            .await
            .map_err(|e| ResearchError::Collection(format!("news: invalid JSON: {}", e)))?;

        parse_news(&body, max_results)
    }
}

/// Parse a News API `everything` response
pub fn parse_news(body: &Value, limit: usize) -> Result<Vec<SourceItem>> {
    if json_string(body, "status").as_deref() == Some("error") {
        let message = json_string(body, "message").unwrap_or_else(|| "unknown error".into());
        return Err(ResearchError::Collection(format!("news: {}", message)));
    }

    let articles = body
        .get("articles")
        .and_then(Value::as_array)
        .ok_or_else(|| ResearchError::Collection("news: missing articles".into()))?;

    Ok(articles
        .iter()
        .filter_map(|a| {
            let title = json_string(a, "title")?;
            let description = json_string(a, "description").unwrap_or_default();
            let outlet = a
                .pointer("/source/name")
                .and_then(Value::as_str)
                .map(|s| format!("{}: ", s))
                .unwrap_or_default();
            Some(SourceItem {
                source: "news".to_string(),
                category: "reports".to_string(),
                title,
                snippet: truncate_chars(
                    &format!("{}{}", outlet, collapse_whitespace(&description)),
                    sources::SNIPPET_MAX_CHARS,
                ),
                url: json_string(a, "url"),
            })
        })
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <title>Scaling   Laws
      for Agents</title>
    <summary>  We study how agents scale. </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <title>Second Paper</title>
    <summary>Short.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_arxiv() {
        let items = parse_arxiv(FEED, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Scaling Laws for Agents");
        assert_eq!(
            items[0].snippet,
            "Ada Lovelace, Alan Turing. We study how agents scale."
        );
        assert_eq!(
            items[0].url.as_deref(),
            Some("http://arxiv.org/abs/2401.00001v1")
        );
        assert_eq!(items[1].snippet, "Short.");
        assert!(items.iter().all(|i| i.category == "academic"));
    }

    #[test]
    fn test_parse_arxiv_decodes_entities() {
        let feed = r#"<feed><entry>
    <id>http://arxiv.org/abs/2401.00003v1</id>
    <title>Bounds for P &amp; NP when n &lt; 3</title>
    <summary>Ratios &gt; 1 &amp; &quot;tight&quot; bounds.</summary>
    <author><name>Barbara Liskov &amp; Co</name></author>
  </entry></feed>"#;

        let items = parse_arxiv(feed, 5);
        assert_eq!(items[0].title, "Bounds for P & NP when n < 3");
        assert_eq!(
            items[0].snippet,
            "Barbara Liskov & Co. Ratios > 1 & \"tight\" bounds."
        );
    }

    #[test]
    fn test_parse_arxiv_respects_limit() {
        assert_eq!(parse_arxiv(FEED, 1).len(), 1);
        assert!(parse_arxiv("<feed></feed>", 5).is_empty());
    }

    #[test]
    fn test_parse_wikipedia() {
        let body = json!({
            "query": {"search": [
                {"title": "Meaning of life", "snippet": "The <span class=\"searchmatch\">meaning</span> of life"},
                {"title": "42 (number)", "snippet": "x".repeat(800)},
                {"title": "Third", "snippet": ""},
                {"title": "Fourth", "snippet": ""}
            ]}
        });

        let items = parse_wikipedia(&body, 3).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].snippet, "The meaning of life");
        assert_eq!(
            items[0].url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Meaning_of_life")
        );
        assert!(items[1].snippet.ends_with("..."));
        assert_eq!(items[1].snippet.chars().count(), 503);
    }

    #[test]
    fn test_parse_wikipedia_error() {
        let body = json!({"error": {"info": "bad request"}});
        let err = parse_wikipedia(&body, 3).unwrap_err();
        assert!(err.to_string().contains("bad request"));
        assert!(parse_wikipedia(&json!({}), 3).is_err());
    }

    #[test]
    fn test_parse_news() {
        let body = json!({
            "status": "ok",
            "articles": [
                {"title": "AI wins", "description": "Big\nnews", "url": "https://n.example/1", "source": {"name": "Wire"}},
                {"description": "untitled is skipped"}
            ]
        });

        let items = parse_news(&body, 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].snippet, "Wire: Big news");
        assert_eq!(items[0].category, "reports");
    }

    #[test]
    fn test_parse_news_error_status() {
        let body = json!({"status": "error", "message": "apiKeyInvalid"});
        assert!(parse_news(&body, 10).unwrap_err().to_string().contains("apiKeyInvalid"));
    }

    #[tokio::test]
    async fn test_news_without_key_fails() {
        let source = NewsSource::new(http_client().unwrap(), None);
        let err = source.search("anything", 5).await.unwrap_err();
        assert!(matches!(err, ResearchError::Collection(_)));
        assert!(err.to_string().contains("NEWS_API_KEY"));
    }
}
