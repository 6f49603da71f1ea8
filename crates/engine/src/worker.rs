use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use url::Url;

use trawl_core::{CrawlResult, FetchError, Fetcher};

/// One member of the crawl pool. Owns its politeness state: because hosts
/// are pinned to workers by the distributor, a private `host -> last
/// fetch` map is enough to enforce the per-host interval.
pub(crate) struct Worker {
    id: usize,
    input: mpsc::Receiver<Url>,
    results: mpsc::Sender<CrawlResult>,
    dead_letter: mpsc::Sender<Url>,
    shutdown: broadcast::Receiver<()>,
    fetcher: Arc<dyn Fetcher>,
    politeness_delay: Duration,
    history: HashMap<String, Instant>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: usize,
        input: mpsc::Receiver<Url>,
        results: mpsc::Sender<CrawlResult>,
        dead_letter: mpsc::Sender<Url>,
        shutdown: broadcast::Receiver<()>,
        fetcher: Arc<dyn Fetcher>,
        politeness_delay: Duration,
    ) -> Self {
        Self {
            id,
            input,
            results,
            dead_letter,
            shutdown,
            fetcher,
            politeness_delay,
            history: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(worker = self.id, "worker started");
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    debug!(worker = self.id, "worker shutting down");
                    return;
                }
                next = self.input.recv() => {
                    let Some(url) = next else {
                        debug!(worker = self.id, "input drained, worker exiting");
                        return;
                    };
                    let result = self.crawl(url).await;
                    if self.results.send(result).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn crawl(&mut self, url: Url) -> CrawlResult {
        let host = url.host_str().unwrap_or_default().to_string();

        while self.must_wait(&host) {
            debug!(worker = self.id, host = %host, "politeness wait");
            tokio::time::sleep(self.politeness_delay).await;
        }
        // Stamped before the fetch and unconditionally, so a failing host
        // still backs off.
        self.history.insert(host, Instant::now());

        debug!(worker = self.id, url = %url, "fetching");
        match self.fetcher.fetch(&url).await {
            Ok(resp) => {
                let content_type = resp
                    .content_type
                    .unwrap_or_else(|| sniff_content_type(&resp.body).to_string());
                CrawlResult {
                    url,
                    status: resp.status,
                    content_type,
                    body: resp.body,
                    elapsed: resp.elapsed,
                    is_error: false,
                    info: None,
                }
            }
            Err(FetchError::Body {
                status,
                content_type,
                elapsed,
                message,
            }) => {
                warn!(worker = self.id, url = %url, status, "body read failed: {message}");
                CrawlResult {
                    url,
                    status,
                    content_type: content_type.unwrap_or_default(),
                    body: Vec::new(),
                    elapsed,
                    is_error: true,
                    info: None,
                }
            }
            Err(FetchError::Transport(message)) => {
                warn!(worker = self.id, url = %url, "fetch failed: {message}");
                if self.dead_letter.send(url.clone()).await.is_err() {
                    debug!(worker = self.id, "dead-letter sink closed");
                }
                CrawlResult::transport_error(url)
            }
        }
    }

    fn must_wait(&self, host: &str) -> bool {
        self.history
            .get(host)
            .map(|last| last.elapsed() < self.politeness_delay)
            .unwrap_or(false)
    }
}

/// Content type from the first bytes of the body, for responses without a
/// Content-Type header. Magic numbers first, then a cheap text heuristic.
fn sniff_content_type(body: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(body) {
        return kind.mime_type();
    }
    match std::str::from_utf8(body) {
        Ok(text) if text.trim_start().starts_with('<') => "text/html; charset=utf-8",
        Ok(_) => "text/plain; charset=utf-8",
        Err(_) => "application/octet-stream",
    }
}
