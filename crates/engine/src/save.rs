use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use trawl_core::{CrawlError, CrawlResult, Processor};
use trawl_storage::ByteStore;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/svg+xml", ".svg"),
];

fn image_extension(content_type: &str) -> &'static str {
    IMAGE_EXTENSIONS
        .iter()
        .find(|(mime, _)| content_type.starts_with(mime))
        .map(|(_, ext)| *ext)
        .unwrap_or(".bin")
}

fn save_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}{}", url.path()),
        None => format!("{host}{}", url.path()),
    }
}

/// Persists fetched bodies to the byte store: HTML under
/// `<host>/<path>.html`, images under an extension derived from the
/// content type. Everything else is refused.
pub struct SaveToStore {
    store: Arc<dyn ByteStore>,
}

impl SaveToStore {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Processor for SaveToStore {
    fn name(&self) -> &str {
        "save-to-store"
    }

    async fn process(&self, result: &CrawlResult) -> Result<(), CrawlError> {
        let key = save_key(&result.url);

        if result.content_type.starts_with("text/html") {
            self.store.set(&format!("{key}.html"), &result.body).await
        } else if result.content_type.starts_with("image/") {
            let ext = image_extension(&result.content_type);
            self.store.set(&format!("{key}{ext}"), &result.body).await
        } else {
            Err(CrawlError::UnsupportedContentType(
                result.content_type.clone(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use trawl_storage::FileStore;

    fn html_result(url: &str, content_type: &str, body: &[u8]) -> CrawlResult {
        let mut result =
            CrawlResult::transport_error(Url::parse(url).expect("URL should parse"));
        result.is_error = false;
        result.status = 200;
        result.content_type = content_type.to_string();
        result.body = body.to_vec();
        result
    }

    #[test]
    fn save_key_is_host_port_and_path() {
        let url = Url::parse("http://127.0.0.1:8123/a/b").expect("URL");
        assert_eq!(save_key(&url), "127.0.0.1:8123/a/b");

        let url = Url::parse("https://example.com/").expect("URL");
        assert_eq!(save_key(&url), "example.com/");
    }

    #[tokio::test]
    async fn html_bodies_get_an_html_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileStore::new(dir.path()).expect("store"));
        let save = SaveToStore::new(store);

        let result = html_result("http://example.com/page", "text/html", b"<html></html>");
        save.process(&result).await.expect("save should succeed");
        assert!(dir.path().join("example.com/page.html").exists());
    }

    #[tokio::test]
    async fn images_get_an_extension_from_content_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileStore::new(dir.path()).expect("store"));
        let save = SaveToStore::new(store);

        let result = html_result("http://example.com/logo", "image/png", &[0x89]);
        save.process(&result).await.expect("save should succeed");
        assert!(dir.path().join("example.com/logo.png").exists());

        let result = html_result("http://example.com/blob", "image/x-exotic", &[0x00]);
        save.process(&result).await.expect("save should succeed");
        assert!(dir.path().join("example.com/blob.bin").exists());
    }

    #[tokio::test]
    async fn other_content_types_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileStore::new(dir.path()).expect("store"));
        let save = SaveToStore::new(store);

        let result = html_result("http://example.com/api", "application/json", b"{}");
        let err = save.process(&result).await.expect_err("json must be refused");
        assert!(matches!(err, CrawlError::UnsupportedContentType(_)));
    }
}
