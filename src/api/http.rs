//! reqwest-backed implementation of [`AssistantApi`]

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::types::{Envelope, ErrorsPayload, ReportPayload, ResetRequest};
use super::{paths, AssistantApi, ChatReply, ChatRequest, ExportOutcome, MetricsSnapshot};
use super::{ErrorRecord, SecurityLogs, SecurityStatus, TraceRecord};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// HTTP client for the GROZY backend
#[derive(Clone, Debug)]
pub struct HttpAssistantClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpAssistantClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: config.base_url.clone(),
                message: "URL cannot be used as a base".to_string(),
            });
        }
        // Relative joins replace the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                message: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::transport(paths::label(path), e))?;
        decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(paths::label(path), e))?;
        decode(path, response).await
    }

    async fn get_with_key<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {} (keyed)", url);
        let response = self
            .client
            .get(url)
            .header(paths::API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| ClientError::transport(paths::label(path), e))?;
        decode(path, response).await
    }

    async fn get_enveloped<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let envelope: Envelope<T> = self.get_json(path).await?;
        envelope
            .into_payload()
            .map_err(|message| ClientError::malformed(paths::label(path), message))
    }
}

/// Check the status, then decode the body as JSON
async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ClientError::transport(paths::label(path), e))?;

    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint: paths::label(path),
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| ClientError::malformed(paths::label(path), e))
}

#[async_trait]
impl AssistantApi for HttpAssistantClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.post_json(paths::CHAT, request).await
    }

    async fn reset_session(&self, session_id: &str) -> Result<()> {
        let body = ResetRequest {
            session_id: session_id.to_string(),
        };
        let _: serde_json::Value = self.post_json(paths::RESET, &body).await?;
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let url = self.endpoint(paths::HEALTH)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::transport(paths::label(paths::HEALTH), e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                endpoint: paths::label(paths::HEALTH),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.get_enveloped(paths::METRICS).await
    }

    async fn traces(&self) -> Result<Vec<TraceRecord>> {
        self.get_enveloped(paths::TRACES).await
    }

    async fn errors(&self) -> Result<Vec<ErrorRecord>> {
        let payload: ErrorsPayload = self.get_enveloped(paths::ERRORS).await?;
        Ok(payload.recent_errors)
    }

    async fn export_metrics(&self) -> Result<ExportOutcome> {
        self.get_json(paths::EXPORT).await
    }

    async fn generate_report(&self) -> Result<String> {
        let payload: ReportPayload = self.get_json(paths::REPORT).await?;
        Ok(payload.report)
    }

    async fn security_status(&self) -> Result<SecurityStatus> {
        self.get_json(paths::SECURITY_STATUS).await
    }

    async fn security_logs(&self, api_key: &str) -> Result<SecurityLogs> {
        self.get_with_key(paths::SECURITY_LOGS, api_key).await
    }
}
