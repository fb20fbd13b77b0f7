use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::logs::constants;

#[derive(Debug, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum TransmissionError {
    #[error("failed to send logs: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{status}: failed to push logs: {body}")]
    Status { status: StatusCode, body: String },
}

impl TransmissionError {
    /// Status returned by the endpoint, if it answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransmissionError::Request(e) => e.status(),
            TransmissionError::Status { status, .. } => Some(*status),
        }
    }
}

/// Delivers one batch body to the collection endpoint.
#[async_trait]
pub trait LogSender: Send + Sync {
    async fn send(&self, body: Vec<u8>) -> Result<(), TransmissionError>;
}

#[derive(Clone, Debug)]
pub struct HttpSender {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpSender {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(HttpSender {
            client: build_client(config)?,
            url: config.url.clone(),
            headers: build_headers(config)?,
        })
    }
}

/// Routes requests through `https_proxy` when one is set. A proxy that cannot
/// be used is a configuration error.
fn build_client(config: &Config) -> Result<reqwest::Client, ConfigError> {
    let builder = reqwest::Client::builder();
    let builder = match &config.https_proxy {
        Some(proxy) => {
            let invalid = |e: reqwest::Error| ConfigError::InvalidProxy {
                proxy: proxy.clone(),
                reason: e.to_string(),
            };
            builder.proxy(reqwest::Proxy::https(proxy.as_str()).map_err(invalid)?)
        }
        None => builder,
    };
    builder
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

fn build_headers(config: &Config) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static(constants::CONTENT_TYPE),
    );

    let custom = [
        (constants::SUMO_NAME_HEADER, &config.custom_source_name),
        (constants::SUMO_HOST_HEADER, &config.custom_source_host),
        (constants::SUMO_CATEGORY_HEADER, &config.custom_source_category),
    ];
    for (name, value) in custom {
        if let Some(value) = value {
            let invalid = || ConfigError::InvalidHeader(name.to_string());
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.insert(header, value);
        }
    }

    Ok(headers)
}

#[async_trait]
impl LogSender for HttpSender {
    async fn send(&self, body: Vec<u8>) -> Result<(), TransmissionError> {
        let size = body.len();
        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!("Shipped {size} bytes of logs: {status}");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(TransmissionError::Status { status, body })
    }
}
