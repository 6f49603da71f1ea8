use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::signal;
use tracing::info;
use url::Url;

use trawl_core::{AppConfig, CrawlError, CrawlResult, Processor};
use trawl_engine::Crawler;
use trawl_fetch::HttpFetcher;
use trawl_storage::{Database, FileStore};

/// Logs one line per processed page.
struct PageLogger;

#[async_trait]
impl Processor for PageLogger {
    fn name(&self) -> &str {
        "page-logger"
    }

    async fn process(&self, result: &CrawlResult) -> Result<(), CrawlError> {
        info!(
            url = %result.url,
            status = result.status,
            content_type = %result.content_type,
            size = result.body.len(),
            is_error = result.is_error,
            "processed page"
        );
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    mut config: AppConfig,
    urls: Vec<String>,
    workers: Option<usize>,
    output: Option<String>,
    exclude: Vec<String>,
    revisit_delay_secs: Option<u64>,
    max_redirects: Option<usize>,
    database_url: Option<String>,
) -> Result<()> {
    if let Some(n) = workers {
        config.crawler.workers = n;
    }
    if let Some(dir) = output {
        config.storage.output_dir = dir;
    }
    if !exclude.is_empty() {
        config.crawler.exclude.extend(exclude);
    }
    if let Some(secs) = revisit_delay_secs {
        config.crawler.revisit_delay_secs = secs;
    }
    if let Some(n) = max_redirects {
        config.fetch.max_redirects = n;
    }
    if let Some(url) = database_url {
        config.database.url = url;
    }

    let mut seeds = Vec::with_capacity(urls.len());
    for url in &urls {
        seeds.push(Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?);
    }

    let crawl_config = config.crawl_config();
    info!(
        seeds = seeds.len(),
        workers = crawl_config.worker_count,
        output = %config.storage.output_dir,
        "starting web crawler"
    );

    let store = Arc::new(FileStore::new(&config.storage.output_dir)?);
    let fetcher = Arc::new(HttpFetcher::new(
        crawl_config.fetch_timeout,
        crawl_config.max_redirects,
        &config.fetch.user_agent,
    )?);

    let mut crawler = Crawler::new(seeds, crawl_config, fetcher, store).await;
    crawler.add_processor(Arc::new(PageLogger));

    if !config.database.url.is_empty() {
        let db = Database::connect(&config.database.url).await?;
        db.run_migrations().await?;
        crawler = crawler.with_database(db);
    }

    let handle = crawler.handle();
    let mut run = tokio::spawn(crawler.run());

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("shutdown signal received, terminating gracefully");
            handle.terminate().await;
            tokio::select! {
                _ = &mut run => {}
                _ = signal::ctrl_c() => {
                    info!("second signal, stopping workers immediately");
                    handle.shutdown_now();
                    let _ = run.await;
                }
            }
            info!("crawler stopped");
        }
        _ = &mut run => {
            info!("crawl completed");
        }
    }

    Ok(())
}
