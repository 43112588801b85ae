//! HTTP implementation of [`RemoteApi`]
//!
//! One reqwest client is built per `HttpApi` and reused for every request.
//! Each request carries the bearer token and a JSON content type.
//!
//! Connection failures, timeouts and the statuses 429, 502, 503 and 504 are
//! retried with exponential backoff. When the retry budget runs out, a
//! connection failure becomes [`ProvisioningError::Transient`] and a
//! retryable status is handed back to the caller like any other response.
//!
//! A `POST` may already have been applied when its response is lost, so it
//! is only retried when the request never reached the remote (connect
//! errors) or was refused outright (429, 503).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, error, instrument, trace, warn};

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::{Method, RemoteApi, RemoteResponse};
use crate::config::ProvisionerConfig;
use crate::error::{ConfigError, ProvisioningError, ProvisioningResult};

const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Statuses that guarantee the request was not applied
const REFUSED_STATUSES: [u16; 2] = [429, 503];

fn is_retryable_status(method: Method, status: u16) -> bool {
    if method.is_idempotent() {
        RETRYABLE_STATUSES.contains(&status)
    } else {
        REFUSED_STATUSES.contains(&status)
    }
}

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    backoff: BackoffConfig,
}

impl HttpApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        backoff: BackoffConfig,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ConfigError::Invalid {
                key: "http client".to_string(),
                message: err.to_string(),
            })?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            backoff,
        })
    }

    pub fn from_config(config: &ProvisionerConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.grafana_url,
            &config.api_key,
            Duration::from_secs(config.timeout_secs),
            BackoffConfig::with_max_retries(config.max_retries),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    #[instrument(skip(self, body), fields(base = %self.base_url))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> ProvisioningResult<RemoteResponse> {
        let url = self.url(path);
        let action = format!("{method} {path}");
        let mut backoff = ExponentialBackoff::with_config(self.backoff.clone());

        loop {
            let mut request = self
                .client
                .request(to_reqwest(method), &url)
                .bearer_auth(&self.api_key)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

            if let Some(body) = &body {
                request = request.body(body.clone());
            }

            trace!("sending {action}");

            let (failure, retry) = match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match response.text().await {
                        Ok(text) => {
                            let response = RemoteResponse::new(status, text);
                            if !is_retryable_status(method, status)
                                || backoff.attempt_number() >= self.backoff.max_retries
                            {
                                log_response(&action, &response);
                                return Ok(response);
                            }
                            (format!("status {status}"), true)
                        }
                        Err(err) => (
                            format!("failed to read response body: {err}"),
                            method.is_idempotent(),
                        ),
                    }
                }
                Err(err) => {
                    let retry = method.is_idempotent() || err.is_connect();
                    (err.to_string(), retry)
                }
            };

            let delay = if retry { backoff.next_delay() } else { None };
            match delay {
                Some(delay) => {
                    warn!(
                        "{action} failed ({failure}), retry {} of {} in {delay:?}",
                        backoff.attempt_number(),
                        self.backoff.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!("{action} failed after {} attempts: {failure}", backoff.attempt_number() + 1);
                    return Err(ProvisioningError::Transient {
                        action,
                        attempts: backoff.attempt_number() + 1,
                        message: failure,
                    });
                }
            }
        }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn log_response(action: &str, response: &RemoteResponse) {
    if response.status >= 500 {
        error!("{action}: {} - {}", response.status, response.body);
    } else {
        debug!("{action}: {} - {}", response.status, response.body);
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn get(&self, path: &str) -> ProvisioningResult<RemoteResponse> {
        self.send(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse> {
        self.send(Method::Post, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: String) -> ProvisioningResult<RemoteResponse> {
        self.send(Method::Put, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> ProvisioningResult<RemoteResponse> {
        self.send(Method::Delete, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(base, "key", Duration::from_secs(1), BackoffConfig::immediate(0)).unwrap()
    }

    #[test]
    fn test_url_joining() {
        assert_eq!(
            api("http://grafana:3000/").url("api/folders"),
            "http://grafana:3000/api/folders"
        );
        assert_eq!(
            api("http://grafana:3000").url("/api/folders"),
            "http://grafana:3000/api/folders"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        // Nothing listens on the discard port.
        let api = api("http://127.0.0.1:9");
        let err = api.get("api/folders").await.unwrap_err();

        assert!(matches!(err, ProvisioningError::Transient { attempts: 1, .. }));
        assert!(err.is_retryable());
    }
}
