//! HTTP page fetcher
//!
//! One pooled reqwest client per service, fixed user agent and referer,
//! per-request timeout. A non-2xx status is an ordinary outcome, not an
//! error; only transport failures surface as [`FetchError`].

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use thiserror::Error;
use url::Url;

use crate::config::CrawlConfig;

/// Transport-level fetch failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid referrer header: {0}")]
    InvalidReferrer(String),
}

/// Result of a completed HTTP exchange, whatever the status code.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The fetched URL (may differ from the request after redirects)
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header, empty when absent
    pub content_type: String,
    /// Response body
    pub body: String,
}

impl FetchOutcome {
    /// Whether this response should be stored and indexed: a 200 with an
    /// HTML-family content type.
    pub fn is_indexable_html(&self) -> bool {
        self.status == 200 && is_html_like(&self.content_type)
    }
}

/// Accepted HTML-family content types.
pub fn is_html_like(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("text/html") || lower.contains("xhtml") || lower.contains("xml")
}

/// Rate-limit-free HTTP fetcher; callers apply their own politeness delay.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let referrer = HeaderValue::from_str(&config.referrer)
            .map_err(|_| FetchError::InvalidReferrer(config.referrer.clone()))?;
        headers.insert(REFERER, referrer);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    /// Perform one GET. Non-2xx responses are returned as values.
    pub async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;
        Ok(FetchOutcome {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

/// Extract outbound links: `a[href]` attributes resolved against the final
/// URL, http(s) only, deduplicated in document order.
pub fn extract_links(outcome: &FetchOutcome) -> Vec<Url> {
    use scraper::{Html, Selector};
    use std::collections::HashSet;

    let document = Html::parse_document(&outcome.body);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Ok(url) = outcome.final_url.join(href) {
                if (url.scheme() == "http" || url.scheme() == "https")
                    && seen.insert(url.as_str().to_string())
                {
                    urls.push(url);
                }
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: u16, content_type: &str, body: &str) -> FetchOutcome {
        FetchOutcome {
            final_url: Url::parse("http://example.com/page").unwrap(),
            status,
            content_type: content_type.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn html_family_content_types_are_accepted() {
        assert!(is_html_like("text/html"));
        assert!(is_html_like("text/html; charset=utf-8"));
        assert!(is_html_like("application/xhtml+xml"));
        assert!(is_html_like("application/xml"));
        assert!(is_html_like("TEXT/HTML"));
        assert!(!is_html_like("text/plain"));
        assert!(!is_html_like("image/png"));
        assert!(!is_html_like(""));
    }

    #[test]
    fn only_ok_html_is_indexable() {
        assert!(outcome(200, "text/html", "").is_indexable_html());
        assert!(!outcome(404, "text/html", "").is_indexable_html());
        assert!(!outcome(200, "text/plain", "").is_indexable_html());
    }

    #[test]
    fn links_resolve_against_final_url_and_dedupe() {
        let out = outcome(
            200,
            "text/html",
            r#"
                <a href="/about">About</a>
                <a href="about">Relative</a>
                <a href="http://example.com/about">Same again</a>
                <a href="https://other.com/page">Other</a>
                <a href="mailto:user@example.com">Mail</a>
            "#,
        );

        let urls = extract_links(&out);
        let strings: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            strings,
            vec![
                "http://example.com/about",
                "https://other.com/page",
            ]
        );
    }

    #[test]
    fn pages_without_links_yield_nothing() {
        let out = outcome(200, "text/html", "<html><body><p>text</p></body></html>");
        assert!(extract_links(&out).is_empty());
    }
}
