use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use parley_core::{ApiRequest, CancelHandle, HttpMethod, ParleyError, RawFailure, Transport};

use crate::envelope;

/// Transport envelope over HTTP.
///
/// Every call races the request against its deadline and the caller's
/// cancellation handle; whichever finishes first decides the result.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, ParleyError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ParleyError::ClientSetup(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ParleyError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ParleyError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ParleyError::InvalidEndpoint(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, request: &ApiRequest) -> Result<Value, RawFailure> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(credential) = &request.bearer {
            builder = builder.bearer_auth(credential.expose());
        }

        let response = builder.send().await.map_err(|e| connectivity(&e))?;
        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) if status.is_success() => return Err(connectivity(&e)),
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "Failed to read error body");
                Vec::new()
            }
        };

        envelope::interpret(status.as_u16(), &body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        deadline: Duration,
        cancel: &CancelHandle,
    ) -> Result<Value, RawFailure> {
        if deadline.is_zero() {
            return Err(RawFailure::Unrecognized(
                "deadline must be greater than zero".to_string(),
            ));
        }

        let start = Instant::now();
        debug!(
            method = %request.method,
            path = %request.path,
            deadline_ms = deadline.as_millis() as u64,
            "Sending backend request"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RawFailure::Cancelled),
            outcome = tokio::time::timeout(deadline, self.send(request)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(RawFailure::Timeout { deadline }),
            },
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(path = %request.path, latency_ms, "Backend request succeeded"),
            Err(RawFailure::Cancelled) => {
                debug!(path = %request.path, latency_ms, "Backend request cancelled")
            }
            Err(failure) => {
                warn!(path = %request.path, latency_ms, error = %failure, "Backend request failed")
            }
        }
        result
    }
}

/// Flatten a client error and its source chain into one line.
fn connectivity(err: &reqwest::Error) -> RawFailure {
    let mut raw = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        raw.push_str(": ");
        raw.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    RawFailure::Connectivity { raw }
}
