pub mod extractor;
mod routing;
pub mod save;
pub mod savedb;
mod worker;

pub use extractor::LinkExtractor;
pub use save::SaveToStore;
pub use savedb::SaveToDb;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use url::Url;

use trawl_core::{CrawlConfig, Fetcher, Processor};
use trawl_frontier::Frontier;
use trawl_parser::{ContentParser, HtmlParser};
use trawl_storage::{ByteStore, Database};

use crate::worker::Worker;

/// Buffer for URLs discovered by the link extractor on their way back to
/// the frontier.
const NEW_URL_BUFFER: usize = 256;
const DEAD_LETTER_BUFFER: usize = 64;

/// The crawl engine: frontier, distributor, worker pool, merger and
/// processor pipeline, wired over bounded channels so the task graph
/// stays a DAG even though the data flow is a loop.
pub struct Crawler {
    config: CrawlConfig,
    frontier: Arc<Frontier>,
    urls: mpsc::Receiver<Url>,
    fetcher: Arc<dyn Fetcher>,
    parsers: Vec<Box<dyn ContentParser>>,
    processors: Vec<Arc<dyn Processor>>,
    new_urls_rx: mpsc::Receiver<Url>,
    dead_letter_tx: mpsc::Sender<Url>,
    dead_letter_rx: mpsc::Receiver<Url>,
    shutdown: broadcast::Sender<()>,
}

/// Cloneable control handle for a running crawl.
#[derive(Clone)]
pub struct CrawlHandle {
    frontier: Arc<Frontier>,
    shutdown: broadcast::Sender<()>,
}

impl CrawlHandle {
    /// Graceful termination: stop admissions, let queued URLs drain, let
    /// workers finish. `Crawler::run` returns once the pipeline empties.
    pub async fn terminate(&self) {
        self.frontier.terminate().await;
    }

    /// Immediate termination: workers drop what they are doing.
    pub fn shutdown_now(&self) {
        let _ = self.shutdown.send(());
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }
}

impl Crawler {
    /// Build a crawler with the built-in HTML parser, link extractor and
    /// byte-store save processor registered.
    pub async fn new(
        seeds: Vec<Url>,
        config: CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ByteStore>,
    ) -> Self {
        let (frontier, urls) = Frontier::new(
            seeds,
            config.exclude_patterns.clone(),
            config.revisit_delay,
        )
        .await;
        let frontier = Arc::new(frontier);

        let (new_urls_tx, new_urls_rx) = mpsc::channel(NEW_URL_BUFFER);
        let (dead_letter_tx, dead_letter_rx) = mpsc::channel(DEAD_LETTER_BUFFER);
        let (shutdown, _) = broadcast::channel(1);

        let parsers: Vec<Box<dyn ContentParser>> = vec![Box::new(HtmlParser)];
        let processors: Vec<Arc<dyn Processor>> = vec![
            Arc::new(LinkExtractor::new(new_urls_tx)),
            Arc::new(SaveToStore::new(store)),
        ];

        Self {
            config,
            frontier,
            urls,
            fetcher,
            parsers,
            processors,
            new_urls_rx,
            dead_letter_tx,
            dead_letter_rx,
            shutdown,
        }
    }

    /// Register the relational sink.
    pub fn with_database(mut self, db: Database) -> Self {
        self.processors.push(Arc::new(SaveToDb::new(db)));
        self
    }

    /// Register an additional content parser. Dispatch order is
    /// registration order; the first parser whose `supports` accepts the
    /// content type wins.
    pub fn add_parser(&mut self, parser: Box<dyn ContentParser>) {
        self.parsers.push(parser);
    }

    /// Register an additional result processor.
    pub fn add_processor(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            frontier: Arc::clone(&self.frontier),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Run the crawl until the frontier is terminated and the pipeline
    /// has drained.
    pub async fn run(self) {
        let Crawler {
            config,
            frontier,
            urls,
            fetcher,
            parsers,
            processors,
            mut new_urls_rx,
            dead_letter_tx,
            mut dead_letter_rx,
            shutdown,
        } = self;

        let worker_count = config.worker_count.max(1);
        info!(workers = worker_count, "starting crawl engine");

        let mut inputs = Vec::with_capacity(worker_count);
        let mut results = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (input_tx, input_rx) = mpsc::channel(1);
            let (result_tx, result_rx) = mpsc::channel(1);
            inputs.push(input_tx);
            results.push(result_rx);

            let worker = Worker::new(
                id,
                input_rx,
                result_tx,
                dead_letter_tx.clone(),
                shutdown.subscribe(),
                Arc::clone(&fetcher),
                config.politeness_delay,
            );
            tokio::spawn(worker.run());
        }
        // Workers hold their own clones; dropping ours lets the
        // dead-letter drain finish when they do.
        drop(dead_letter_tx);

        tokio::spawn(routing::distribute_urls(urls, inputs));
        let mut merged = routing::merge_results(results);

        // Discovered links loop back into the frontier.
        let add_frontier = Arc::clone(&frontier);
        tokio::spawn(async move {
            while let Some(url) = new_urls_rx.recv().await {
                let _ = add_frontier.add(url).await;
            }
        });

        // Dead-letter drain, for observability only.
        tokio::spawn(async move {
            let mut dismissed = 0u64;
            while let Some(url) = dead_letter_rx.recv().await {
                dismissed += 1;
                debug!(url = %url, total = dismissed, "dismissed dead-lettered URL");
            }
        });

        while let Some(mut result) = merged.recv().await {
            // Parse once, before the fan-out; the first matching parser
            // wins and the result is read-only afterwards.
            for parser in &parsers {
                if parser.supports(&result.content_type) {
                    match parser.parse(&result.body) {
                        Ok(parsed) => result.info = Some(parsed),
                        Err(e) => warn!(url = %result.url, "failed to parse: {e}"),
                    }
                    break;
                }
            }

            let result = Arc::new(result);
            for processor in &processors {
                let processor = Arc::clone(processor);
                let result = Arc::clone(&result);
                tokio::spawn(async move {
                    if let Err(e) = processor.process(&result).await {
                        error!(
                            processor = processor.name(),
                            url = %result.url,
                            "processor failed: {e}"
                        );
                    }
                });
            }
        }

        info!("crawl engine exited");
    }
}
