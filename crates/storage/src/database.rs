use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use trawl_core::CrawlError;

/// One row of the `pages` table, keyed on URL.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub status_code: i32,
    pub content_type: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub content_length: i32,
    pub fetched_at: DateTime<Utc>,
    pub response_time_ms: i32,
    pub out_links: Vec<String>,
    pub is_error: bool,
    pub raw_html: String,
    pub paragraphs: Vec<String>,
}

/// Relational sink over a Postgres pool. Upserts keyed on `url`.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, CrawlError> {
        Self::with_pool_size(database_url, 16).await
    }

    pub async fn with_pool_size(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, CrawlError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CrawlError::Database(e.to_string()))?;

        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), CrawlError> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlError::Database(e.to_string()))?;
        info!("migrations complete");
        Ok(())
    }

    pub async fn insert_page(&self, page: &PageRecord) -> Result<(), CrawlError> {
        sqlx::query(
            r#"INSERT INTO pages (url, status_code, content_type, title, meta_description,
                                  content_length, fetched_at, response_time_ms, out_links,
                                  is_error, raw_html, paragraphs)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               ON CONFLICT (url) DO UPDATE SET
                   status_code = EXCLUDED.status_code,
                   content_type = EXCLUDED.content_type,
                   title = EXCLUDED.title,
                   meta_description = EXCLUDED.meta_description,
                   content_length = EXCLUDED.content_length,
                   fetched_at = EXCLUDED.fetched_at,
                   response_time_ms = EXCLUDED.response_time_ms,
                   out_links = EXCLUDED.out_links,
                   is_error = EXCLUDED.is_error,
                   raw_html = EXCLUDED.raw_html,
                   paragraphs = EXCLUDED.paragraphs"#,
        )
        .bind(&page.url)
        .bind(page.status_code as i16)
        .bind(&page.content_type)
        .bind(&page.title)
        .bind(&page.meta_description)
        .bind(page.content_length)
        .bind(page.fetched_at)
        .bind(page.response_time_ms)
        .bind(&page.out_links)
        .bind(page.is_error)
        .bind(&page.raw_html)
        .bind(&page.paragraphs)
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlError::Database(e.to_string()))?;
        Ok(())
    }
}
