// src/services/fetch.rs
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Retrieves upstream documents. Tests substitute a scripted implementation.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    async fn fetch_json(&self, url: &str, timeout: Duration) -> Result<Value, FetchError> {
        let body = self.fetch_text(url, timeout).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        info!("Fetching data from URL: {}", url);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, url, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify(e, url, timeout))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

fn classify(error: reqwest::Error, url: &str, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout.as_secs(), url.to_string())
    } else {
        FetchError::Transport(error)
    }
}
