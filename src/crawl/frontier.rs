//! Per-site crawl frontier
//!
//! Owns the pending queue and the campaign-scoped visited set for one site
//! crawl. `push` claims the visited slot atomically before the URL is ever
//! queued, so each normalized URL is fetched at most once per crawl. The
//! frontier is created at campaign start and dropped with it; nothing leaks
//! between campaigns.

use std::collections::VecDeque;

use dashmap::DashSet;
use parking_lot::Mutex;
use url::Url;

use super::filter::UrlFilter;

/// One unit of pending crawl work.
#[derive(Debug, Clone)]
pub struct CrawlUrl {
    pub url: Url,
    /// Edges from the site root (root = 0).
    pub depth: u8,
}

pub struct Frontier {
    queue: Mutex<VecDeque<CrawlUrl>>,
    visited: DashSet<String>,
    max_depth: u8,
}

impl Frontier {
    pub fn new(max_depth: u8) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            visited: DashSet::new(),
            max_depth,
        }
    }

    /// Enqueue a URL at the given depth. Returns false without side effects
    /// when the depth bound is reached or the normalized URL was already
    /// claimed; the visited insert is the atomic test-and-mark step.
    pub fn push(&self, url: Url, depth: u8) -> bool {
        if depth >= self.max_depth {
            return false;
        }
        let normalized = UrlFilter::normalize(url.as_str());
        if !self.visited.insert(normalized) {
            return false;
        }
        self.queue.lock().push_back(CrawlUrl { url, depth });
        true
    }

    pub fn pop(&self) -> Option<CrawlUrl> {
        self.queue.lock().pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn push_claims_visited_slot_once() {
        let frontier = Frontier::new(10);
        assert!(frontier.push(url("http://example.com/a"), 0));
        assert!(!frontier.push(url("http://example.com/a"), 1));
        assert_eq!(frontier.pending(), 1);
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn urls_normalizing_to_same_key_dedupe() {
        let frontier = Frontier::new(10);
        assert!(frontier.push(url("http://example.com/a/../b"), 0));
        assert!(!frontier.push(url("http://example.com/b"), 0));
    }

    #[test]
    fn depth_bound_is_enforced() {
        let frontier = Frontier::new(2);
        assert!(frontier.push(url("http://example.com/0"), 0));
        assert!(frontier.push(url("http://example.com/1"), 1));
        assert!(!frontier.push(url("http://example.com/2"), 2));
        assert_eq!(frontier.pending(), 2);
    }

    #[test]
    fn pop_returns_fifo_order() {
        let frontier = Frontier::new(10);
        frontier.push(url("http://example.com/a"), 0);
        frontier.push(url("http://example.com/b"), 1);

        let first = frontier.pop().unwrap();
        assert_eq!(first.url.as_str(), "http://example.com/a");
        assert_eq!(first.depth, 0);
        let second = frontier.pop().unwrap();
        assert_eq!(second.url.as_str(), "http://example.com/b");
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn rejected_depth_does_not_mark_visited() {
        let frontier = Frontier::new(1);
        assert!(!frontier.push(url("http://example.com/deep"), 1));
        assert_eq!(frontier.visited_count(), 0);
    }
}
