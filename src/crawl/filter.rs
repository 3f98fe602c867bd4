//! URL scope filtering and normalization
//!
//! A discovered link is in scope when it parses, shares the site root's host,
//! carries no fragment, and either has no file extension or one from the
//! document allow-list. Normalized URLs (fragment dropped, relative segments
//! resolved) are the deduplication keys for the visited set.

use url::Url;

/// Path extensions accepted beyond the extensionless case.
const ALLOWED_EXTENSIONS: &[&str] = &[".html", ".htm", ".php", ".asp", ".jsp", ".xhtml"];

/// Scope filter for one site root.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    root: Url,
    root_str: String,
}

impl UrlFilter {
    pub fn new(root_url: &str) -> Result<Self, url::ParseError> {
        let root = Url::parse(root_url)?;
        Ok(Self {
            root,
            root_str: root_url.to_string(),
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// The configured root url as given, used for path stripping.
    pub fn root_str(&self) -> &str {
        &self.root_str
    }

    /// Decide whether a discovered link may be crawled for this site.
    pub fn is_in_scope(&self, raw: &str) -> bool {
        if raw.contains('#') {
            return false;
        }
        let Ok(candidate) = Url::parse(raw) else {
            return false;
        };
        if candidate.scheme() != "http" && candidate.scheme() != "https" {
            return false;
        }
        if candidate.host_str() != self.root.host_str() {
            return false;
        }
        let path = candidate.path().to_ascii_lowercase();
        let segment = path.rsplit('/').next().unwrap_or("");
        if let Some(dot) = segment.rfind('.') {
            let ext = &segment[dot..];
            if !ALLOWED_EXTENSIONS.contains(&ext) {
                return false;
            }
        }
        true
    }

    /// Canonicalize a URL string for visited-set deduplication: resolved
    /// relative segments, no fragment. Malformed input falls back to the
    /// original string unchanged.
    pub fn normalize(raw: &str) -> String {
        match Url::parse(raw) {
            Ok(mut url) => {
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => raw.to_string(),
        }
    }
}

/// Site-relative path of a page: the full URL with the site root prefix
/// stripped. Empty result maps to "/".
pub fn site_path(url: &str, root: &str) -> String {
    let root = root.trim_end_matches('/');
    let rest = url.strip_prefix(root).unwrap_or(url);
    if rest.is_empty() {
        "/".to_string()
    } else if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UrlFilter {
        UrlFilter::new("http://example.com").unwrap()
    }

    #[test]
    fn same_host_document_links_are_in_scope() {
        let f = filter();
        assert!(f.is_in_scope("http://example.com/a"));
        assert!(f.is_in_scope("http://example.com/a/b.html"));
        assert!(f.is_in_scope("http://example.com/page.php"));
        assert!(f.is_in_scope("http://example.com/"));
        assert!(f.is_in_scope("http://example.com/a?q=1"));
    }

    #[test]
    fn foreign_hosts_are_rejected() {
        let f = filter();
        assert!(!f.is_in_scope("https://cdn.example.com/x.png"));
        assert!(!f.is_in_scope("http://other.com/a"));
    }

    #[test]
    fn fragments_are_rejected() {
        let f = filter();
        assert!(!f.is_in_scope("http://example.com/a#section"));
        assert!(!f.is_in_scope("http://example.com/#top"));
    }

    #[test]
    fn asset_extensions_are_rejected() {
        let f = filter();
        assert!(!f.is_in_scope("http://example.com/c.pdf"));
        assert!(!f.is_in_scope("http://example.com/img.PNG"));
        assert!(!f.is_in_scope("http://example.com/style.css"));
        assert!(!f.is_in_scope("http://example.com/app.js"));
    }

    #[test]
    fn dot_in_directory_does_not_reject_extensionless_page() {
        let f = filter();
        assert!(f.is_in_scope("http://example.com/v1.2/docs"));
    }

    #[test]
    fn malformed_and_non_http_urls_are_rejected() {
        let f = filter();
        assert!(!f.is_in_scope("not a url"));
        assert!(!f.is_in_scope("mailto:user@example.com"));
        assert!(!f.is_in_scope("javascript:void(0)"));
    }

    #[test]
    fn normalize_drops_fragment_and_resolves_segments() {
        assert_eq!(
            UrlFilter::normalize("http://example.com/a#frag"),
            "http://example.com/a"
        );
        assert_eq!(
            UrlFilter::normalize("http://example.com/a/../b"),
            "http://example.com/b"
        );
    }

    #[test]
    fn normalize_falls_back_on_malformed_input() {
        assert_eq!(UrlFilter::normalize("::::"), "::::");
    }

    #[test]
    fn site_path_strips_root_prefix() {
        assert_eq!(site_path("http://example.com/a", "http://example.com"), "/a");
        assert_eq!(site_path("http://example.com/a", "http://example.com/"), "/a");
        assert_eq!(site_path("http://example.com/", "http://example.com"), "/");
        assert_eq!(site_path("http://example.com", "http://example.com"), "/");
        assert_eq!(
            site_path("http://example.com/a?q=1", "http://example.com"),
            "/a?q=1"
        );
    }
}
