//! Blocking HTTP seam
//!
//! Wharf is single-threaded; the reqwest client is driven by a private
//! current-thread tokio runtime so callers never see async.

use std::time::Duration;

use crate::error::{RepoError, Result};

/// Minimal HTTP client used by channels and release tasks
pub trait HttpClient {
    /// GET `url`; a 404 is `Ok(None)`, any other failure status is an error
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>>;

    /// POST `body` to `url`, returning the response body
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<Vec<u8>>;

    fn get_text(&self, url: &str) -> Result<Option<String>> {
        match self.get(url)? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                RepoError::Serialization(format!("Invalid UTF-8 from {}: {}", url, e))
            }),
            None => Ok(None),
        }
    }
}

/// reqwest-backed client
pub struct ReqwestClient {
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wharf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            runtime,
            client,
            timeout,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> RepoError {
        if e.is_timeout() {
            RepoError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            RepoError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        tracing::debug!(url, "GET");
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.map_error(e))?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Request to {} failed", url),
                });
            }

            let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
            Ok(Some(bytes.to_vec()))
        })
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        tracing::debug!(url, bytes = body.len(), "POST");
        self.runtime.block_on(async {
            let response = self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| self.map_error(e))?;
            let status = response.status();

            if !status.is_success() {
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Upload to {} failed", url),
                });
            }

            let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
            Ok(bytes.to_vec())
        })
    }
}
