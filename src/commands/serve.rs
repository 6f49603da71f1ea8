use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use trawl_core::AppConfig;
use trawl_engine::Crawler;
use trawl_fetch::HttpFetcher;
use trawl_storage::{Database, FileStore};

#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    jobs: Arc<DashMap<Uuid, JobInfo>>,
}

#[derive(Clone, Serialize)]
struct JobInfo {
    job_id: Uuid,
    url: String,
}

#[derive(Deserialize)]
struct StartCrawlRequest {
    url: String,
}

#[derive(Serialize)]
struct StartCrawlResponse {
    job_id: Uuid,
    status: &'static str,
}

pub async fn run(config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = AppState {
        config: Arc::new(config),
        jobs: Arc::new(DashMap::new()),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/crawl", post(start_crawl))
        .route("/api/v1/status", get(status))
        .with_state(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");
    info!("  GET   /health          - health check");
    info!("  POST  /api/v1/crawl    - start crawl job");
    info!("  GET   /api/v1/status   - running jobs");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let jobs: Vec<JobInfo> = state.jobs.iter().map(|entry| entry.value().clone()).collect();
    Json(serde_json::json!({
        "status": "running",
        "jobs": jobs,
    }))
}

async fn start_crawl(
    State(state): State<AppState>,
    Json(req): Json<StartCrawlRequest>,
) -> Result<(StatusCode, Json<StartCrawlResponse>), (StatusCode, String)> {
    let seed = Url::parse(&req.url)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid URL: {e}")))?;
    if !matches!(seed.scheme(), "http" | "https") || seed.host_str().is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "URL must be absolute http or https".to_string(),
        ));
    }

    let job_id = Uuid::new_v4();
    state.jobs.insert(
        job_id,
        JobInfo {
            job_id,
            url: seed.to_string(),
        },
    );

    let config = Arc::clone(&state.config);
    let jobs = Arc::clone(&state.jobs);
    tokio::spawn(async move {
        info!(job = %job_id, url = %seed, "crawl job started");
        if let Err(e) = run_background_crawl(&config, seed).await {
            error!(job = %job_id, "crawl job failed: {e}");
        }
        jobs.remove(&job_id);
        info!(job = %job_id, "crawl job finished");
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartCrawlResponse {
            job_id,
            status: "queued",
        }),
    ))
}

async fn run_background_crawl(config: &AppConfig, seed: Url) -> Result<()> {
    let crawl_config = config.crawl_config();
    let store = Arc::new(FileStore::new(&config.storage.output_dir)?);
    let fetcher = Arc::new(HttpFetcher::new(
        crawl_config.fetch_timeout,
        crawl_config.max_redirects,
        &config.fetch.user_agent,
    )?);

    let mut crawler = Crawler::new(vec![seed], crawl_config, fetcher, store).await;
    if !config.database.url.is_empty() {
        let db = Database::connect(&config.database.url).await?;
        db.run_migrations().await?;
        crawler = crawler.with_database(db);
    }

    crawler.run().await;
    Ok(())
}
