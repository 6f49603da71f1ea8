use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use trawl_core::{CrawlError, CrawlResult, Processor};
use trawl_storage::{Database, PageRecord};

/// Upper bound on one database write.
const DB_TIMEOUT: Duration = Duration::from_secs(2);

/// Persists a structured row per result, upserting on URL.
pub struct SaveToDb {
    db: Database,
}

impl SaveToDb {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn page_record(result: &CrawlResult) -> PageRecord {
    let (title, meta_description, out_links, paragraphs) = match &result.info {
        Some(info) => (
            Some(info.title.clone()),
            Some(info.description.clone()),
            info.links.iter().map(|t| t.value.clone()).collect(),
            info.paragraphs.clone(),
        ),
        None => (None, None, Vec::new(), Vec::new()),
    };

    PageRecord {
        url: result.url.to_string(),
        status_code: result.status as i32,
        content_type: result.content_type.clone(),
        title,
        meta_description,
        content_length: result.body.len() as i32,
        fetched_at: Utc::now(),
        response_time_ms: result.elapsed.as_millis() as i32,
        out_links,
        is_error: result.is_error,
        raw_html: String::from_utf8_lossy(&result.body).into_owned(),
        paragraphs,
    }
}

#[async_trait]
impl Processor for SaveToDb {
    fn name(&self) -> &str {
        "save-to-db"
    }

    async fn process(&self, result: &CrawlResult) -> Result<(), CrawlError> {
        let record = page_record(result);
        match tokio::time::timeout(DB_TIMEOUT, self.db.insert_page(&record)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CrawlError::Database(format!(
                "insert for {} timed out after {DB_TIMEOUT:?}",
                record.url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use url::Url;

    use trawl_core::{Info, LinkToken};

    #[test]
    fn record_maps_result_fields() {
        let mut result = CrawlResult::transport_error(
            Url::parse("http://example.com/page").expect("URL should parse"),
        );
        result.is_error = false;
        result.status = 200;
        result.content_type = "text/html".to_string();
        result.body = b"<html>hello</html>".to_vec();
        result.elapsed = Duration::from_millis(42);
        result.info = Some(Info {
            title: "T".to_string(),
            description: "D".to_string(),
            paragraphs: vec!["p1".to_string()],
            links: vec![LinkToken {
                name: "link".to_string(),
                value: "/next".to_string(),
            }],
        });

        let record = page_record(&result);
        assert_eq!(record.url, "http://example.com/page");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.content_length, 18);
        assert_eq!(record.response_time_ms, 42);
        assert_eq!(record.title.as_deref(), Some("T"));
        assert_eq!(record.out_links, vec!["/next".to_string()]);
        assert_eq!(record.paragraphs, vec!["p1".to_string()]);
        assert!(!record.is_error);
    }

    #[test]
    fn record_without_info_leaves_parsed_fields_empty() {
        let result = CrawlResult::transport_error(
            Url::parse("http://example.com/").expect("URL should parse"),
        );
        let record = page_record(&result);
        assert!(record.title.is_none());
        assert!(record.out_links.is_empty());
        assert!(record.is_error);
    }
}
