pub mod html;

pub use html::HtmlParser;

use trawl_core::{CrawlError, Info};

/// A content parser declares which content types it can handle and turns
/// a response body into structured page info. Dispatch runs the first
/// parser (in registration order) whose `supports` accepts the result's
/// content type.
pub trait ContentParser: Send + Sync + 'static {
    fn supports(&self, content_type: &str) -> bool;
    fn parse(&self, body: &[u8]) -> Result<Info, CrawlError>;
}
