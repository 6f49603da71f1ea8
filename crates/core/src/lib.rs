pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, CrawlConfig};
pub use error::{CrawlError, FetchError};
pub use types::*;
