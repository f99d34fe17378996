//! HTTP transport against the fieldsync server.

use crate::error::TransportError;
use crate::transport::{PullBatch, PushReport, Transport};
use async_trait::async_trait;
use fieldsync_engine::{DeviceId, PullQuery, PullResponse, PushRequest, PushResponse, SyncableRecord};
use reqwest::{header, Client, RequestBuilder, Response};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Transport`] speaking JSON over `POST /sync/push` and `GET /sync/pull`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    device_id: DeviceId,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new(base_url: impl Into<String>, device_id: impl Into<DeviceId>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, device_id, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        device_id: impl Into<DeviceId>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            device_id: device_id.into(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Read the body of a successful response, mapping other statuses to errors.
    async fn read_body(response: Response) -> Result<Vec<u8>, TransportError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn push_batch(&self, records: &[SyncableRecord]) -> Result<PushReport, TransportError> {
        let request = PushRequest {
            device_id: self.device_id.clone(),
            records: records.to_vec(),
        };
        let body = serde_json::to_vec(&request).map_err(|e| TransportError::Decode(e.to_string()))?;
        let sent = body.len() as u64;

        tracing::debug!("Pushing {} records ({} bytes)", records.len(), sent);

        let response = self
            .authorize(self.client.post(self.url("/sync/push")))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let received = Self::read_body(response).await?;

        let parsed: PushResponse =
            serde_json::from_slice(&received).map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(PushReport {
            results: parsed.results,
            bytes_transferred: sent + received.len() as u64,
        })
    }

    async fn pull_since(
        &self,
        checkpoint: Option<&str>,
        limit: usize,
    ) -> Result<PullBatch, TransportError> {
        let query = PullQuery {
            since: checkpoint.map(str::to_string),
            limit: Some(i64::try_from(limit).unwrap_or(i64::MAX)),
        };

        let response = self
            .authorize(self.client.get(self.url("/sync/pull")))
            .query(&query)
            .send()
            .await?;
        let received = Self::read_body(response).await?;

        let parsed: PullResponse =
            serde_json::from_slice(&received).map_err(|e| TransportError::Decode(e.to_string()))?;

        tracing::debug!(
            "Pulled {} records, checkpoint {}, has_more {}",
            parsed.records.len(),
            parsed.checkpoint,
            parsed.has_more
        );

        Ok(PullBatch {
            records: parsed.records,
            checkpoint: parsed.checkpoint,
            has_more: parsed.has_more,
            bytes_transferred: received.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let transport = HttpTransport::new("http://localhost:3000/", "device-1").unwrap();
        assert_eq!(transport.url("/sync/push"), "http://localhost:3000/sync/push");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let transport = HttpTransport::with_timeout(
            "http://127.0.0.1:9",
            "device-1",
            Duration::from_millis(500),
        )
        .unwrap();

        let result = transport.pull_since(None, 10).await;
        assert!(matches!(
            result,
            Err(TransportError::Network(_)) | Err(TransportError::Timeout)
        ));
    }
}
