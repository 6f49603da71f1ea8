use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CrawlError, FetchError};

/// What the fetcher hands back for one request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Value of the Content-Type header, if the server sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub elapsed: Duration,
}

/// The outcome of crawling a single URL. `info` stays `None` until the
/// engine has run parser dispatch over the body.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub url: Url,
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub elapsed: Duration,
    pub is_error: bool,
    pub info: Option<Info>,
}

impl CrawlResult {
    /// Result for a fetch that never produced a response.
    pub fn transport_error(url: Url) -> Self {
        Self {
            url,
            status: 0,
            content_type: String::new(),
            body: Vec::new(),
            elapsed: Duration::ZERO,
            is_error: true,
            info: None,
        }
    }
}

/// One outbound reference found while parsing (`name` is the token kind,
/// `value` the raw attribute text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkToken {
    pub name: String,
    pub value: String,
}

/// Structured digest of a parsed page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub description: String,
    pub paragraphs: Vec<String>,
    pub links: Vec<LinkToken>,
}

/// Page fetcher contract: one GET, full body, timing.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

/// A result sink. Every registered processor receives every crawl result
/// concurrently with its peers and must treat the result as read-only.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn process(&self, result: &CrawlResult) -> Result<(), CrawlError>;
}
