use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use trawl_core::{CrawlError, CrawlResult, Processor};

/// Turns the parsed link tokens of a result into frontier candidates:
/// resolve against the page URL, strip every query parameter, keep only
/// absolute http/https. Discovered URLs go out over a channel the engine
/// drains into the frontier, which keeps the task graph acyclic.
pub struct LinkExtractor {
    new_urls: mpsc::Sender<Url>,
}

impl LinkExtractor {
    pub fn new(new_urls: mpsc::Sender<Url>) -> Self {
        Self { new_urls }
    }
}

#[async_trait]
impl Processor for LinkExtractor {
    fn name(&self) -> &str {
        "link-extractor"
    }

    async fn process(&self, result: &CrawlResult) -> Result<(), CrawlError> {
        let Some(info) = &result.info else {
            return Err(CrawlError::Parse(format!(
                "no parsed info available for {}",
                result.url
            )));
        };

        let mut found = Vec::new();
        for token in &info.links {
            let mut candidate = match result.url.join(&token.value) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!(href = %token.value, "failed to parse link: {e}");
                    continue;
                }
            };
            candidate.set_query(None);
            if matches!(candidate.scheme(), "http" | "https") {
                found.push(candidate);
            }
        }
        info!(url = %result.url, count = found.len(), "extracted URLs");

        for candidate in found {
            if self.new_urls.send(candidate).await.is_err() {
                debug!("new-URL sink closed, dropping remaining links");
                break;
            }
        }
        Ok(())
    }
}
