//! Web search (Plan B when direct scraping is blocked)

use crate::html::html_to_text;
use crate::scraper::DESKTOP_USER_AGENT;
use async_trait::async_trait;
use mia_core::SearchError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Maximum number of results kept per query
pub const MAX_RESULTS: usize = 5;

static RESULT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .expect("valid regex")
});

static RESULT_LINK_HREF_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href="([^"]*)"[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*>(.*?)</a>"#)
        .expect("valid regex")
});

static SNIPPET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(?:a|div|td)\b[^>]*class="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
        .expect("valid regex")
});

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub body: String,
    pub href: String,
}

/// General web search
#[async_trait]
pub trait WebSearch: Send + Sync + std::fmt::Debug {
    /// Up to [`MAX_RESULTS`] hits for `query`
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Search results rendered for the intel pool
///
/// Never fails: errors become `"Search error: ..."` text.
pub async fn search_digest(search: &dyn WebSearch, query: &str) -> String {
    tracing::info!(query, "Plan B: searching the web");
    match search.search(query).await {
        Ok(results) if results.is_empty() => "No search results found.".to_string(),
        Ok(results) => results
            .iter()
            .map(|r| format!("{}: {} (Source: {})", r.title, r.body, r.href))
            .collect::<Vec<_>>()
            .join("\n\n"),
        Err(e) => {
            tracing::error!(error = %e, "Search failed");
            format!("Search error: {e}")
        }
    }
}

/// DuckDuckGo HTML endpoint (no API key)
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoSearch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: DDG_HTML_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Override endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::USER_AGENT, DESKTOP_USER_AGENT)
            .form(&[("q", query)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let page = response
            .text()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;
        let results = parse_results(&page, MAX_RESULTS);
        tracing::debug!(query, results = results.len(), "Search complete");
        Ok(results)
    }
}

/// Parse result links and snippets from a DuckDuckGo HTML page
#[must_use]
pub fn parse_results(page: &str, limit: usize) -> Vec<SearchResult> {
    let mut links: Vec<(usize, usize, String, String)> = RESULT_LINK
        .captures_iter(page)
        .chain(RESULT_LINK_HREF_FIRST.captures_iter(page))
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((whole.start(), whole.end(), c[1].to_string(), c[2].to_string()))
        })
        .collect();
    links.sort_by_key(|(start, ..)| *start);
    links.dedup_by_key(|(start, ..)| *start);

    let mut results = Vec::new();
    for (i, (_, end, href, title)) in links.iter().enumerate() {
        if results.len() >= limit {
            break;
        }
        let Some(href) = resolve_href(href) else {
            continue;
        };

        let next_start = links.get(i + 1).map_or(page.len(), |(start, ..)| *start);
        let body = page
            .get(*end..next_start)
            .and_then(|segment| SNIPPET.captures(segment))
            .map(|c| html_to_text(&c[1]))
            .unwrap_or_default();

        results.push(SearchResult {
            title: html_to_text(title),
            body,
            href,
        });
    }
    results
}

/// Real target of a result link; `None` for ads and unusable links
fn resolve_href(raw: &str) -> Option<String> {
    let raw = raw.replace("&amp;", "&");
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else if raw.starts_with('/') {
        format!("https://duckduckgo.com{raw}")
    } else {
        raw
    };

    let url = Url::parse(&absolute).ok()?;
    let is_ddg = url
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"));
    if !is_ddg {
        return Some(url.to_string());
    }
    if url.path() == "/y.js" {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r##"
<div class="result results_links result--ad">
  <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x&amp;u3=abc">Sponsored GPUs</a>
  <a class="result__snippet" href="#">Buy now</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Flambdalabs.com%2Fservice%2Fgpu-cloud&amp;rut=abc">Lambda <b>GPU</b> Cloud</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">On-demand <b>H100</b> at $2.49/hr &amp; more</a>
</div>
<div class="result results_links web-result">
  <a rel="nofollow" class="result__a" href="https://www.runpod.io/pricing">RunPod Pricing</a>
</div>
"##;

    #[test]
    fn parses_results_and_skips_ads() {
        let results = parse_results(PAGE, 5);
        assert_eq!(
            results,
            vec![
                SearchResult {
                    title: "Lambda GPU Cloud".to_string(),
                    body: "On-demand H100 at $2.49/hr & more".to_string(),
                    href: "https://lambdalabs.com/service/gpu-cloud".to_string(),
                },
                SearchResult {
                    title: "RunPod Pricing".to_string(),
                    body: String::new(),
                    href: "https://www.runpod.io/pricing".to_string(),
                },
            ]
        );
    }

    #[test]
    fn limit_is_respected() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
        assert!(parse_results("<html>no results</html>", 5).is_empty());
    }

    #[derive(Debug)]
    struct Fixed(Result<Vec<SearchResult>, u16>);

    #[async_trait]
    impl WebSearch for Fixed {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, SearchError> {
            self.0.clone().map_err(SearchError::Status)
        }
    }

    #[tokio::test]
    async fn digest_formats() {
        let hits = Fixed(Ok(vec![
            SearchResult {
                title: "A".to_string(),
                body: "alpha".to_string(),
                href: "https://a.example".to_string(),
            },
            SearchResult {
                title: "B".to_string(),
                body: "beta".to_string(),
                href: "https://b.example".to_string(),
            },
        ]));
        assert_eq!(
            search_digest(&hits, "q").await,
            "A: alpha (Source: https://a.example)\n\nB: beta (Source: https://b.example)"
        );

        assert_eq!(search_digest(&Fixed(Ok(vec![])), "q").await, "No search results found.");
        assert_eq!(
            search_digest(&Fixed(Err(503)), "q").await,
            "Search error: search provider returned status 503"
        );
    }
}
