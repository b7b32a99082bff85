//! HTTP implementation of the daemon control API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::DaemonApi;
use crate::error::{ApiError, ConfigError, REQUEST_CLOSED_STATUS};
use crate::types::{
    ConnectionIp, ConnectionRequest, ConnectionStatistics, ConnectionStatusResponse,
    ConsumerLocation,
};

/// Error document returned by the daemon
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Talks to the daemon over HTTP
#[derive(Debug, Clone)]
pub struct HttpDaemonApi {
    client: Client,
    base_url: String,
}

impl HttpDaemonApi {
    /// Create a client for the daemon listening at `base_url`
    ///
    /// `timeout` applies to every request that does not carry its own.
    #[tracing::instrument(skip(timeout), fields(timeout_ms = timeout.as_millis()))]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
            field: "daemon.base_url".to_string(),
            reason: format!("Failed to parse URL: {}", e),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::InvalidUrl {
                    field: "daemon.base_url".to_string(),
                    reason: format!("Only HTTP/HTTPS schemes are supported, got: {}", scheme),
                });
            }
        }

        let client = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if status.as_u16() == REQUEST_CLOSED_STATUS {
            debug!("Daemon closed the request");
            return Err(ApiError::RequestClosed);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|error| error.message)
                .unwrap_or(body);
            warn!(status = %status, message = %message, "Daemon rejected request");
            return Err(ApiError::Daemon {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<T, ApiError> {
        let mut request = self.client.get(self.endpoint(path));
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        decode(self.send(request).await?).await
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode {
            reason: e.to_string(),
        }
    } else {
        ApiError::Network {
            reason: e.to_string(),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Decode {
                reason: e.to_string(),
            }
        }
    })
}

#[async_trait]
impl DaemonApi for HttpDaemonApi {
    #[tracing::instrument(skip(self), fields(provider_id = %request.provider_id))]
    async fn connection_create(
        &self,
        request: &ConnectionRequest,
    ) -> Result<ConnectionStatusResponse, ApiError> {
        let response = self
            .send(self.client.put(self.endpoint("connection")).json(request))
            .await?;
        decode(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn connection_cancel(&self) -> Result<(), ApiError> {
        self.send(self.client.delete(self.endpoint("connection")))
            .await?;
        Ok(())
    }

    async fn connection_status(&self) -> Result<ConnectionStatusResponse, ApiError> {
        self.get_json("connection", None).await
    }

    async fn connection_statistics(&self) -> Result<ConnectionStatistics, ApiError> {
        self.get_json("connection/statistics", None).await
    }

    async fn connection_ip(&self, timeout: Option<Duration>) -> Result<ConnectionIp, ApiError> {
        self.get_json("connection/ip", timeout).await
    }

    async fn location(&self, timeout: Option<Duration>) -> Result<ConsumerLocation, ApiError> {
        self.get_json("location", timeout).await
    }
}
