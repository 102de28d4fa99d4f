/// Snapshot API client
///
/// `GET {base_url}/scanner?<filter params>&page=N` returns `{ "pairs": [...] }`.
/// An empty page means the listing is exhausted.
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

use super::convert::{convert_rows, ScannerApiResponse};
use super::filters::FilterSpec;
use super::types::AssetRecord;
use crate::arguments::is_debug_api_enabled;
use crate::config::ApiConfig;
use crate::errors::{FetchError, ScannerError};
use crate::logger::{self, LogTag};

const SCANNER_ENDPOINT: &str = "/scanner";

/// One converted page of snapshot results
#[derive(Debug, Clone, Default)]
pub struct SnapshotPage {
    pub records: Vec<AssetRecord>,
    pub is_last_page: bool,
}

/// Source of snapshot pages; the HTTP client in production, an in-memory
/// table in tests
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_page(&self, spec: &FilterSpec, page: u32) -> Result<SnapshotPage, FetchError>;
}

pub struct ScannerApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ScannerApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ScannerError> {
        if timeout_seconds == 0 {
            return Err(ScannerError::Config(
                "API timeout must be greater than zero".to_string(),
            ));
        }
        let parsed = url::Url::parse(base_url).map_err(|e| {
            ScannerError::Config(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScannerError::Config(format!(
                "API base URL must be http(s), got '{}'",
                base_url
            )));
        }

        let timeout = Duration::from_secs(timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScannerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ScannerError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(String, String)]) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let value = response.json::<T>().await.map_err(|e| FetchError::Parse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if is_debug_api_enabled() {
            logger::debug(
                LogTag::Api,
                &format!(
                    "GET {} ({} params) -> {} in {}ms",
                    endpoint,
                    query.len(),
                    status.as_u16(),
                    start.elapsed().as_millis()
                ),
            );
        }

        Ok(value)
    }
}

#[async_trait]
impl SnapshotSource for ScannerApiClient {
    async fn fetch_page(&self, spec: &FilterSpec, page: u32) -> Result<SnapshotPage, FetchError> {
        let mut query = spec.to_query_params();
        query.push(("page".to_string(), page.to_string()));

        let response: ScannerApiResponse = self.get_json(SCANNER_ENDPOINT, &query).await?;
        let is_last_page = response.pairs.is_empty();
        let records = convert_rows(&response.pairs);

        if is_debug_api_enabled() {
            logger::debug(
                LogTag::Api,
                &format!(
                    "Snapshot page {} [{}]: {} rows{}",
                    page,
                    spec.summary(),
                    records.len(),
                    if is_last_page { " (exhausted)" } else { "" }
                ),
            );
        }

        Ok(SnapshotPage {
            records,
            is_last_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one HTTP response and hand back the request line
    async fn one_shot_server(status: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let request_line = request.lines().next().unwrap_or_default().to_string();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(request_line);
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_fetch_page_sends_filter_and_page() {
        let body = r#"{"pairs":[{"pairAddress":"0xa","chainId":56,"price":"1.5","volume":"2000"}]}"#;
        let (base, request) = one_shot_server("200 OK", body).await;

        let client = ScannerApiClient::new(&base, 5).unwrap();
        let page = client.fetch_page(&FilterSpec::trending(), 2).await.unwrap();

        assert!(!page.is_last_page);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].price_usd, 1.5);

        let line = request.await.unwrap();
        assert!(line.starts_with("GET /scanner?"));
        assert!(line.contains("rankBy=volume"));
        assert!(line.contains("minVol24H=1000"));
        assert!(line.contains("page=2"));
    }

    #[tokio::test]
    async fn test_empty_page_is_last() {
        let (base, _request) = one_shot_server("200 OK", r#"{"pairs":[]}"#).await;
        let client = ScannerApiClient::new(&base, 5).unwrap();
        let page = client.fetch_page(&FilterSpec::new_pairs(), 1).await.unwrap();
        assert!(page.is_last_page);
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (base, _request) = one_shot_server("503 Service Unavailable", "{}").await;
        let client = ScannerApiClient::new(&base, 5).unwrap();
        match client.fetch_page(&FilterSpec::trending(), 1).await {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(ScannerApiClient::new("ws://localhost:3000", 5).is_err());
        assert!(ScannerApiClient::new("not a url", 5).is_err());
        assert!(ScannerApiClient::new("http://localhost:3000", 0).is_err());
        let client = ScannerApiClient::new("http://localhost:3000/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
