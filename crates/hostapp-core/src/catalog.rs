//! Remote catalog client.
//!
//! The catalog is a single endpoint taking a form-encoded operation selector:
//! `get=list` enumerates the available apps and `get=plugin&id=<pid>` returns
//! a bundle. Responses are JSON envelopes `{status, info|data, message?}`; the
//! listing may also come back as a bare array.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hostapp_schema::Manifest;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Bare(Vec<Value>),
    Envelope(Envelope),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: u16,
    #[serde(default, alias = "data")]
    info: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    /// Fails unless the envelope reports status 200.
    fn into_payload(self) -> Result<Value> {
        if self.status == 200 {
            return self
                .info
                .ok_or_else(|| AppError::RetrievalFailed("response carried no payload".into()));
        }
        let message = self
            .message
            .or_else(|| match self.info {
                Some(Value::String(s)) => Some(s),
                Some(other) => Some(other.to_string()),
                None => None,
            })
            .unwrap_or_else(|| format!("status {}", self.status));
        Err(AppError::RetrievalFailed(message))
    }
}

/// Source of available apps and their bundles.
#[async_trait]
pub trait Catalog: Send + Sync + std::fmt::Debug {
    /// Every app the catalog publishes.
    ///
    /// # Errors
    ///
    /// `RetrievalFailed` when the catalog refuses, `Timeout` or `Http` on transport failure.
    async fn list(&self) -> Result<Vec<Manifest>>;

    /// The gzip tar bundle for `id`.
    ///
    /// # Errors
    ///
    /// `RetrievalFailed` when the catalog refuses, `Timeout` or `Http` on transport failure.
    async fn fetch_bundle(&self, id: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the remote app catalog.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Create a client for the catalog at `url`, bounding every request by `timeout`.
    ///
    /// # Errors
    ///
    /// The HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Endpoint every request is posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<(reqwest::StatusCode, String)> {
        let send = async {
            let resp = self.client.post(&self.url).form(form).send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        send.await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout {
                    operation: format!("catalog request to {}", self.url),
                    after: self.timeout,
                }
            } else {
                AppError::Http(e)
            }
        })
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    /// Fetch the complete list of available apps.
    ///
    /// Entries that do not parse as manifests are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`AppError::RetrievalFailed`] when the catalog rejects the request,
    /// [`AppError::Timeout`] or [`AppError::Http`] on transport failure.
    async fn list(&self) -> Result<Vec<Manifest>> {
        let (status, body) = self.post(&[("get", "list")]).await?;
        let parsed: ListResponse = serde_json::from_str(&body)
            .map_err(|e| http_failure(status, &body, Some(&e)))?;

        let items = match parsed {
            ListResponse::Bare(items) => items,
            ListResponse::Envelope(envelope) => match envelope.into_payload()? {
                Value::Array(items) => items,
                other => {
                    return Err(AppError::RetrievalFailed(format!(
                        "expected an app list, got {other}"
                    )));
                }
            },
        };

        let mut apps = Vec::with_capacity(items.len());
        for item in items {
            match Manifest::from_value(item) {
                Ok(manifest) => apps.push(manifest),
                Err(e) => tracing::warn!("Skipping catalog entry: {e}"),
            }
        }
        tracing::debug!("Catalog lists {} apps", apps.len());
        Ok(apps)
    }

    /// Fetch the bundle archive for `id`, decoded from base64.
    ///
    /// # Errors
    ///
    /// [`AppError::RetrievalFailed`] carrying the server's message when the
    /// catalog reports anything but status 200 or the payload is not base64.
    async fn fetch_bundle(&self, id: &str) -> Result<Vec<u8>> {
        let (status, body) = self.post(&[("get", "plugin"), ("id", id)]).await?;
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| http_failure(status, &body, Some(&e)))?;

        match envelope.into_payload()? {
            Value::String(encoded) => STANDARD
                .decode(encoded.trim())
                .map_err(|e| AppError::RetrievalFailed(format!("invalid bundle encoding: {e}"))),
            other => Err(AppError::RetrievalFailed(format!(
                "expected an encoded bundle, got {other}"
            ))),
        }
    }
}

fn http_failure(
    status: reqwest::StatusCode,
    body: &str,
    parse_error: Option<&serde_json::Error>,
) -> AppError {
    let snippet: String = body.trim().chars().take(200).collect();
    if status.is_success() {
        let reason = parse_error.map_or_else(String::new, ToString::to_string);
        AppError::RetrievalFailed(format!("malformed catalog response ({reason}): {snippet}"))
    } else {
        AppError::RetrievalFailed(format!("{status}: {snippet}"))
    }
}
