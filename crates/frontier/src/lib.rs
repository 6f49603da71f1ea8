use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// How long `add` waits for queue space before discarding the URL.
const ADMISSION_TIMEOUT: Duration = Duration::from_millis(50);

/// Grace window between signaling termination and closing the queue, so
/// in-flight `add` calls observe the flag instead of a closed channel.
const TERMINATE_GRACE: Duration = Duration::from_millis(100);

/// History entries older than the revisit delay are swept once the map
/// grows past this many entries.
const PURGE_THRESHOLD: usize = 4096;

struct Inner {
    /// URL string -> last enqueue time. An entry younger than the revisit
    /// delay means the URL is refused.
    history: HashMap<String, Instant>,
    /// Producer side of the URL queue. Dropped on terminate so the
    /// consumer sees end-of-stream once the queue drains.
    queue: Option<mpsc::Sender<Url>>,
}

/// Authoritative source of URLs to crawl. Admission control (dedup within
/// the revisit window, exclusion substrings, termination), bounded
/// backpressure, orderly shutdown.
pub struct Frontier {
    inner: RwLock<Inner>,
    exclude: Vec<String>,
    revisit_delay: Duration,
    terminating: AtomicBool,
    closing: watch::Sender<bool>,
}

impl Frontier {
    /// Build a frontier seeded with `seeds`. Returns the frontier and the
    /// single-pass consumer side of its URL queue. Queue capacity is twice
    /// the seed count so seeding itself never stalls on backpressure.
    pub async fn new(
        seeds: Vec<Url>,
        exclude: Vec<String>,
        revisit_delay: Duration,
    ) -> (Self, mpsc::Receiver<Url>) {
        let capacity = (seeds.len() * 2).max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (closing, _) = watch::channel(false);

        let frontier = Self {
            inner: RwLock::new(Inner {
                history: HashMap::new(),
                queue: Some(tx),
            }),
            exclude,
            revisit_delay,
            terminating: AtomicBool::new(false),
            closing,
        };

        for seed in seeds {
            frontier.add(seed).await;
        }

        (frontier, rx)
    }

    /// Try to admit a URL. Returns false when the frontier is terminating,
    /// the URL was enqueued within the revisit window, an exclusion
    /// substring matches, or the queue refuses the URL within the
    /// admission timeout. Check-then-insert runs under the exclusive lock,
    /// so concurrent adds of the same URL enqueue it exactly once.
    pub async fn add(&self, url: Url) -> bool {
        if self.terminating.load(Ordering::SeqCst) {
            return false;
        }

        let key = url.to_string();
        for pattern in &self.exclude {
            if key.contains(pattern.as_str()) {
                debug!(url = %key, pattern = %pattern, "excluded");
                return false;
            }
        }

        let mut inner = self.inner.write().await;
        if self.terminating.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(last) = inner.history.get(&key) {
            if last.elapsed() < self.revisit_delay {
                debug!(url = %key, "already seen");
                return false;
            }
        }

        if inner.history.len() >= PURGE_THRESHOLD {
            let revisit_delay = self.revisit_delay;
            inner.history.retain(|_, t| t.elapsed() < revisit_delay);
        }

        inner.history.insert(key.clone(), Instant::now());

        let Some(queue) = inner.queue.clone() else {
            inner.history.remove(&key);
            return false;
        };

        let mut closing = self.closing.subscribe();
        let accepted = tokio::select! {
            sent = queue.send_timeout(url, ADMISSION_TIMEOUT) => match sent {
                Ok(()) => true,
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(url = %key, "queue full, discarding URL");
                    false
                }
                Err(SendTimeoutError::Closed(_)) => false,
            },
            _ = closing.changed() => {
                warn!(url = %key, "frontier is closing, discarding URL");
                false
            }
        };

        if !accepted {
            inner.history.remove(&key);
        }
        accepted
    }

    /// True iff the URL has a history entry younger than the revisit delay.
    pub async fn seen(&self, url: &Url) -> bool {
        let inner = self.inner.read().await;
        inner
            .history
            .get(url.as_str())
            .map(|last| last.elapsed() < self.revisit_delay)
            .unwrap_or(false)
    }

    /// Stop admitting URLs and close the queue. Idempotent. Queued URLs
    /// remain deliverable until the consumer drains them.
    pub async fn terminate(&self) {
        if self.terminating.swap(true, Ordering::SeqCst) {
            return;
        }
        self.closing.send_replace(true);

        tokio::time::sleep(TERMINATE_GRACE).await;

        let mut inner = self.inner.write().await;
        inner.queue = None;
        info!("frontier terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test URL should parse")
    }

    #[tokio::test]
    async fn add_then_consume() {
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;

        assert!(frontier.add(url("https://example.com/")).await);
        let got = urls.recv().await.expect("URL should be queued");
        assert_eq!(got.as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn duplicate_within_revisit_window_is_refused() {
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;

        assert!(frontier.add(url("https://example.com/page1")).await);
        urls.recv().await.expect("URL should be queued");

        assert!(!frontier.add(url("https://example.com/page1")).await);
        assert!(frontier.seen(&url("https://example.com/page1")).await);
    }

    #[tokio::test]
    async fn revisit_after_delay_expires() {
        let (frontier, mut urls) =
            Frontier::new(vec![], vec![], Duration::from_millis(20)).await;

        assert!(frontier.add(url("https://example.com/")).await);
        urls.recv().await.expect("URL should be queued");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!frontier.seen(&url("https://example.com/")).await);
        assert!(frontier.add(url("https://example.com/")).await);
    }

    #[tokio::test]
    async fn exclude_patterns_refuse_matching_urls() {
        let exclude = vec!["example.com".to_string(), "test.com".to_string()];
        let (frontier, mut urls) = Frontier::new(vec![], exclude, Duration::from_secs(60)).await;

        assert!(!frontier.add(url("https://example.com/page")).await);
        assert!(!frontier.add(url("https://test.com/page")).await);
        assert!(frontier.add(url("https://allowed.com/page")).await);
        assert!(frontier.add(url("https://sub.allowed.com/page")).await);

        assert_eq!(
            urls.recv().await.expect("first allowed URL").as_str(),
            "https://allowed.com/page"
        );
    }

    #[tokio::test]
    async fn seeds_are_immediately_available() {
        let seeds = vec![
            url("https://example1.com/"),
            url("https://example2.com/"),
            url("https://example3.com/"),
        ];
        let (_frontier, mut urls) = Frontier::new(seeds, vec![], Duration::from_secs(60)).await;

        for _ in 0..3 {
            assert!(urls.recv().await.is_some(), "seed should be queued");
        }
    }

    #[tokio::test]
    async fn terminate_rejects_add_and_closes_stream() {
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;

        frontier.terminate().await;
        frontier.terminate().await; // idempotent

        assert!(!frontier.add(url("https://example.com/")).await);
        assert!(urls.recv().await.is_none(), "stream should be closed");
    }

    #[tokio::test]
    async fn queued_urls_survive_terminate_until_drained() {
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;

        assert!(frontier.add(url("https://example.com/a")).await);
        frontier.terminate().await;

        assert_eq!(
            urls.recv().await.expect("queued URL remains deliverable").path(),
            "/a"
        );
        assert!(urls.recv().await.is_none());
    }

    #[tokio::test]
    async fn queue_full_rolls_back_history() {
        // Capacity 1 (no seeds): the second add times out and must forget
        // the URL so it stays admissible later.
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;

        assert!(frontier.add(url("https://example.com/a")).await);
        assert!(!frontier.add(url("https://example.com/b")).await);
        assert!(!frontier.seen(&url("https://example.com/b")).await);

        urls.recv().await.expect("first URL");
        assert!(frontier.add(url("https://example.com/b")).await);
    }

    #[tokio::test]
    async fn concurrent_adds_enqueue_once() {
        let (frontier, mut urls) = Frontier::new(vec![], vec![], Duration::from_secs(60)).await;
        let frontier = std::sync::Arc::new(frontier);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = std::sync::Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                frontier.add(url("https://example.com/same")).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.expect("task should not panic") {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1, "exactly one concurrent add may win");
        assert!(urls.recv().await.is_some());
    }
}
