//! HTTP transport abstraction
//!
//! The identity core drives all network I/O through the [`Transport`]
//! trait; [`HttpTransport`] is the reqwest-backed default. The transport
//! performs no retries and no business-level interpretation: a 200 with a
//! protocol error in the body is still a successful send.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// HTTP method for an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Canonical upper-case name, as used in the signature base string
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Raw transport reply: status metadata plus body bytes
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// HTTP status code (informational only; never drives flow logic)
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no network connection")]
    NotConnected,

    #[error("request timed out")]
    Timeout,

    #[error("http failure: {0}")]
    Http(String),
}

/// Asynchronous HTTP transport
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Send one request; the reply carries the body regardless of HTTP
    /// status so the caller can parse protocol errors out of it.
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(String, String)],
        params: &BTreeMap<String, String>,
    ) -> Result<TransportReply, TransportError>;
}

/// Default reqwest-backed transport (rustls, no cookies, no redirects
/// beyond reqwest defaults)
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Build with the default client configuration
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    /// Build around a caller-configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::NotConnected
        } else {
            TransportError::Http(error.to_string())
        }
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(String, String)],
        params: &BTreeMap<String, String>,
    ) -> Result<TransportReply, TransportError> {
        let mut builder = match method {
            HttpMethod::Get => self.client.get(url).query(params),
            HttpMethod::Post => self.client.post(url).form(params),
        };

        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(Self::classify)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(Self::classify)?
            .to_vec();

        tracing::trace!(url, status, bytes = body.len(), "transport reply");

        Ok(TransportReply { status, body })
    }
}
