use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use trawl_core::{FetchError, FetchResponse, Fetcher};

/// Plain HTTP page fetcher over a shared reqwest client. One GET per
/// call, full body, wall-clock timing.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(
        timeout: Duration,
        max_redirects: usize,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let start = Instant::now();
        debug!(url = %url, "fetching");

        let resp = self.client.get(url.as_str()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            FetchError::Transport(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().await.map_err(|e| FetchError::Body {
            status,
            content_type: content_type.clone(),
            elapsed: start.elapsed(),
            message: e.to_string(),
        })?;

        Ok(FetchResponse {
            status,
            content_type,
            body: body.to_vec(),
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), 5, "trawl-test").expect("client should build")
    }

    #[tokio::test]
    async fn fetch_returns_status_content_type_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>hi</body></html>")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/page", server.url())).expect("server URL");
        let resp = fetcher().fetch(&url).await.expect("fetch should succeed");

        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.content_type.as_deref(),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(resp.body, b"<html><body>hi</body></html>");
        assert!(resp.elapsed > Duration::ZERO);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_content_type_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/raw")
            .with_status(200)
            .with_body("data")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/raw", server.url())).expect("server URL");
        let resp = fetcher().fetch(&url).await.expect("fetch should succeed");
        assert!(resp.content_type.is_none());
    }

    #[tokio::test]
    async fn non_2xx_status_is_not_a_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("gone")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/missing", server.url())).expect("server URL");
        let resp = fetcher().fetch(&url).await.expect("404 still yields a response");
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn unresolvable_host_is_a_transport_error() {
        let url = Url::parse("http://nonexistent-host.invalid/").expect("URL");
        let err = fetcher().fetch(&url).await.expect_err("fetch must fail");
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
