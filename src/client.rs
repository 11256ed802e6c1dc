//! Remote analysis boundary.
//!
//! Defines the [`AnalysisClient`] trait the dispatcher talks to and the
//! multipart HTTP implementation used against the real service. The service
//! is opaque: one request per document carrying its raw bytes, a JSON object
//! back on success, a non-2xx status with a `detail` message on failure.
//!
//! # Retry Strategy
//!
//! Disabled by default (`remote.max_retries = 0`) so each document costs
//! exactly one request. When enabled:
//! - HTTP 429 and 5xx → retry
//! - other 4xx → fail immediately
//! - transport errors → retry
//! - backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::VirtualFile;

/// Something that can analyze one document and return the raw response.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, file: &VirtualFile) -> Result<Value, RemoteError>;
}

/// Multipart HTTP client for the analysis service.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
}

impl HttpAnalysisClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url(),
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn form_for(file: &VirtualFile) -> Result<reqwest::multipart::Form, RemoteError> {
        // The service only ever sees the bare name, never the logical path.
        let part = reqwest::multipart::Part::bytes(file.content.as_ref().clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| RemoteError::RequestFailed(e.to_string()))?;
        Ok(reqwest::multipart::Form::new().part("file", part))
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, file: &VirtualFile) -> Result<Value, RemoteError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(path = %file.logical_path, attempt, "retrying analysis request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .multipart(Self::form_for(file)?)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response
                            .json()
                            .await
                            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
                        if !json.is_object() {
                            return Err(RemoteError::InvalidResponse(
                                "expected a JSON object".to_string(),
                            ));
                        }
                        return Ok(json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = RemoteError::AnalysisRejected {
                        status: status.as_u16(),
                        detail: failure_detail(status.as_u16(), &body_text),
                    };

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(RemoteError::RequestFailed(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RemoteError::RequestFailed("no attempt was made".to_string())))
    }
}

/// Human-readable message of a failure response: the JSON `detail` field
/// (string or list of `{msg}` objects), else the raw body, else the status.
pub fn failure_detail(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match json.get("detail") {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}
