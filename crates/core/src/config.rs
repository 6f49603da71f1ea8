use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_revisit_delay_secs")]
    pub revisit_delay_secs: u64,
    #[serde(default = "default_politeness_delay_secs")]
    pub politeness_delay_secs: u64,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Empty disables the database sink.
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_workers() -> usize {
    10
}
fn default_revisit_delay_secs() -> u64 {
    2 * 60 * 60
}
fn default_politeness_delay_secs() -> u64 {
    2
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    format!("trawl/{}", env!("CARGO_PKG_VERSION"))
}
fn default_output_dir() -> String {
    "./data".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            revisit_delay_secs: default_revisit_delay_secs(),
            politeness_delay_secs: default_politeness_delay_secs(),
            exclude: Vec::new(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Collapse the file config into the runtime crawl settings.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_redirects: self.fetch.max_redirects,
            revisit_delay: Duration::from_secs(self.crawler.revisit_delay_secs),
            worker_count: self.crawler.workers,
            exclude_patterns: self.crawler.exclude.clone(),
            politeness_delay: Duration::from_secs(self.crawler.politeness_delay_secs),
            fetch_timeout: Duration::from_secs(self.fetch.timeout_secs),
        }
    }
}

/// Runtime settings for one crawl session.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub max_redirects: usize,
    pub revisit_delay: Duration,
    pub worker_count: usize,
    pub exclude_patterns: Vec<String>,
    pub politeness_delay: Duration,
    pub fetch_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            revisit_delay: Duration::from_secs(default_revisit_delay_secs()),
            worker_count: default_workers(),
            exclude_patterns: Vec::new(),
            politeness_delay: Duration::from_secs(default_politeness_delay_secs()),
            fetch_timeout: Duration::from_secs(default_fetch_timeout_secs()),
        }
    }
}
