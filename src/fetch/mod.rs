//! Loading the raw bytes of a visit export from disk or over HTTP.

mod auth;
mod basic;
mod client;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::SourceError;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

/// Downloads `url` with `client`, failing on non-success status codes.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, SourceError> {
    let parsed = url
        .parse()
        .map_err(|_| SourceError::InvalidUrl(url.to_string()))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let fetch_err = |source| SourceError::Fetch {
        url: url.to_string(),
        source,
    };

    let resp = client
        .execute(req)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(fetch_err)?;
    let bytes = resp.bytes().await.map_err(fetch_err)?;

    Ok(bytes.to_vec())
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads `source` (a local path or an http(s) URL), gunzipping `.gz` sources.
///
/// URLs are requested with `Authorization: Bearer <token>` when `token` is set.
#[tracing::instrument(skip(token))]
pub async fn load_source(source: &str, token: Option<&str>) -> Result<Vec<u8>, SourceError> {
    let bytes = if is_url(source) {
        match token {
            Some(token) => fetch_bytes(&ApiKey::bearer(BasicClient::new(), token)?, source).await?,
            None => fetch_bytes(&BasicClient::new(), source).await?,
        }
    } else {
        tokio::fs::read(source).await.map_err(|e| SourceError::Io {
            path: source.to_string(),
            source: e,
        })?
    };

    debug!(bytes = bytes.len(), "Source bytes loaded");

    if source.ends_with(".gz") {
        gunzip(source, &bytes)
    } else {
        Ok(bytes)
    }
}

fn gunzip(source: &str, bytes: &[u8]) -> Result<Vec<u8>, SourceError> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| SourceError::Decompress {
            path: source.to_string(),
            source: e,
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use reqwest::header::{AUTHORIZATION, HeaderMap};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    const CSV: &str = "customer_id,checkin,stay\nc1,2024-03-01 10:00:00,30\n";
    const URL: &str = "https://example.com/visits.csv";

    /// Answers every request with a fixed status and body and keeps the
    /// headers it was sent.
    struct StubClient {
        status: u16,
        seen: Arc<Mutex<Vec<HeaderMap>>>,
    }

    impl StubClient {
        fn new(status: u16) -> (Self, Arc<Mutex<Vec<HeaderMap>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let client = Self {
                status,
                seen: Arc::clone(&seen),
            };
            (client, seen)
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.seen.lock().unwrap().push(req.headers().clone());
            let resp = http::Response::builder()
                .status(self.status)
                .body(CSV)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_fetch_bytes_success() {
        let (client, seen) = StubClient::new(200);
        let bytes = fetch_bytes(&client, URL).await.unwrap();

        assert_eq!(bytes, CSV.as_bytes());
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(seen.lock().unwrap()[0].get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_http_error_status_is_fatal() {
        let (client, _) = StubClient::new(500);
        let err = fetch_bytes(&client, URL).await.unwrap_err();

        match err {
            SourceError::Fetch { url, source } => {
                assert_eq!(url, URL);
                assert_eq!(source.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bearer_header_sent() {
        let (stub, seen) = StubClient::new(200);
        let client = ApiKey::bearer(stub, "secret").unwrap();

        fetch_bytes(&client, URL).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][AUTHORIZATION], "Bearer secret");
    }

    #[tokio::test]
    async fn test_bearer_wrapper_keeps_error_status() {
        let (stub, _) = StubClient::new(401);
        let client = ApiKey::bearer(stub, "expired").unwrap();

        let err = fetch_bytes(&client, URL).await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch { .. }));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/visits.csv"));
        assert!(is_url("http://localhost:8080/export"));
        assert!(!is_url("data/visits.csv"));
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.csv");
        std::fs::write(&path, CSV).unwrap();

        let bytes = load_source(path.to_str().unwrap(), None).await.unwrap();
        assert_eq!(bytes, CSV.as_bytes());
    }

    #[tokio::test]
    async fn test_load_gzipped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.csv.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let bytes = load_source(path.to_str().unwrap(), None).await.unwrap();
        assert_eq!(bytes, CSV.as_bytes());
    }

    #[tokio::test]
    async fn test_corrupt_gzip_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.csv.gz");
        std::fs::write(&path, CSV).unwrap();

        let err = load_source(path.to_str().unwrap(), None).await.unwrap_err();
        assert!(matches!(err, SourceError::Decompress { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let err = load_source("/nonexistent/visits.csv", None).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = fetch_bytes(&BasicClient::new(), "not a url").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidUrl(_)));
    }
}
