use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api_types::*;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("decoding response from {endpoint} failed: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl RemoteError {
    /// True when the service answered with a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self, RemoteError::Status { .. })
    }
}

pub const KEYWORDS_ENDPOINT: &str = "/extract-keywords-llm-batch";
pub const TRANSFER_ENDPOINT: &str = "/analyze-transfer-intent";
pub const SUGGESTION_ENDPOINT: &str = "/generate-suggestion";

/// The remote analysis service. Internals are opaque; only these contracts matter.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn extract_keywords(
        &self,
        rows: &[ApiRow],
        column_name: &str,
    ) -> Result<KeywordBatchResponse, RemoteError>;

    async fn analyze_transfer_intent(
        &self,
        rows: &[ApiRow],
    ) -> Result<TransferIntentResponse, RemoteError>;

    async fn generate_suggestion(&self, text: &str) -> Result<String, RemoteError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<T, RemoteError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let start = std::time::Instant::now();
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| RemoteError::Transport { endpoint, source })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Remote call rejected - endpoint={}, status={}", endpoint, status.as_u16());
            return Err(RemoteError::Status { endpoint, status: status.as_u16() });
        }

        let parsed = resp
            .json::<T>()
            .await
            .map_err(|source| RemoteError::Decode { endpoint, source })?;

        info!(
            "Remote call completed - endpoint={}, duration={:.2}s",
            endpoint,
            start.elapsed().as_secs_f32()
        );
        Ok(parsed)
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn extract_keywords(
        &self,
        rows: &[ApiRow],
        column_name: &str,
    ) -> Result<KeywordBatchResponse, RemoteError> {
        let body = KeywordBatchRequest { data: rows, column_name };
        self.post_json(KEYWORDS_ENDPOINT, &body).await
    }

    async fn analyze_transfer_intent(
        &self,
        rows: &[ApiRow],
    ) -> Result<TransferIntentResponse, RemoteError> {
        let body = TransferIntentRequest { data: rows };
        self.post_json(TRANSFER_ENDPOINT, &body).await
    }

    async fn generate_suggestion(&self, text: &str) -> Result<String, RemoteError> {
        let body = SuggestionRequest { text };
        let resp: SuggestionResponse = self.post_json(SUGGESTION_ENDPOINT, &body).await?;
        Ok(resp.suggestion)
    }
}
