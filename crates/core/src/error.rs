use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Fetch failures, split by where in the request lifecycle they occurred.
/// `Transport` means no response was obtained at all; `Body` means headers
/// arrived but the body could not be read, so partial metadata is kept.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("body read failed (status {status}): {message}")]
    Body {
        status: u16,
        content_type: Option<String>,
        elapsed: std::time::Duration,
        message: String,
    },
}
