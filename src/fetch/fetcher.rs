use crate::fetch::http_client::{HttpClient, HttpRequest};
use crate::fetch::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::models::ErrorKind;
use crate::utils::constants::{HTTP_OK, HTTP_TOO_MANY_REQUESTS, LOOKUP_PATH};
use std::sync::Arc;
use thiserror::Error;

/// Terminal outcome of a lookup that did not return a 200.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out on all {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("rate limited on all {attempts} attempts")]
    RateLimitedExhausted { attempts: u32 },

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("request failed: {message}")]
    Exception { message: String },

    #[error("retry budget exhausted")]
    MaxRetries,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::RateLimitedExhausted { .. } => ErrorKind::RateLimitedExhausted,
            FetchError::Http { .. } => ErrorKind::HttpError,
            FetchError::Exception { .. } => ErrorKind::Exception,
            FetchError::MaxRetries => ErrorKind::MaxRetries,
        }
    }

    /// Extra detail kept in the error log: status code or transport message.
    pub fn detail(&self) -> Option<String> {
        match self {
            FetchError::Http { status } => Some(status.to_string()),
            FetchError::Exception { message } => Some(message.clone()),
            FetchError::Timeout { .. }
            | FetchError::RateLimitedExhausted { .. }
            | FetchError::MaxRetries => None,
        }
    }
}

/// Build the lookup URL from the API base URL.
pub fn lookup_endpoint(base_url: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, LOOKUP_PATH)
    } else {
        format!("{}/{}", base_url, LOOKUP_PATH)
    }
}

/// Performs one bounded-retry lookup per call.
///
/// 429 responses are retried with exponential backoff and timeouts with a
/// fixed pause, both within `max_attempts`. Any other status and any other
/// transport failure end the lookup immediately. No state survives a call.
pub struct RateLimitedFetcher {
    client: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    endpoint: String,
    api_key: String,
}

impl RateLimitedFetcher {
    pub fn new(
        client: Arc<dyn HttpClient>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }


    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        Arc::clone(&self.sleeper)
    }

    fn build_request(&self, latitude: f64, longitude: f64) -> HttpRequest {
        let body = serde_json::json!({
            "location": {
                "latitude": latitude,
                "longitude": longitude,
            }
        });

        HttpRequest::post(&self.endpoint)
            .with_query("key", &self.api_key)
            .with_json_body(&body)
            .with_timeout(self.policy.request_timeout)
    }

    /// Look up current conditions; returns the raw response body on HTTP 200.
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> Result<String, FetchError> {
        let mut last_failure = FetchError::MaxRetries;

        for attempt in 0..self.policy.max_attempts {
            let request = self.build_request(latitude, longitude);

            match self.client.execute(request).await {
                Ok(response) if response.status == HTTP_OK => {
                    return Ok(response.body);
                }
                Ok(response) if response.status == HTTP_TOO_MANY_REQUESTS => {
                    last_failure = FetchError::RateLimitedExhausted {
                        attempts: attempt + 1,
                    };
                    if self.policy.is_last_attempt(attempt) {
                        break;
                    }
                    let delay = self.policy.rate_limit_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        "Rate limited at ({}, {}), backing off {:.2}s",
                        latitude,
                        longitude,
                        delay.as_secs_f64()
                    );
                    self.sleeper.sleep(delay).await;
                }
                Ok(response) => {
                    return Err(FetchError::Http {
                        status: response.status,
                    });
                }
                Err(error) if error.is_timeout() => {
                    last_failure = FetchError::Timeout {
                        attempts: attempt + 1,
                    };
                    if self.policy.is_last_attempt(attempt) {
                        break;
                    }
                    tracing::warn!(attempt = attempt + 1, "Lookup timed out, retrying: {}", error);
                    self.sleeper.sleep(self.policy.timeout_delay(attempt)).await;
                }
                Err(error) => {
                    return Err(FetchError::Exception {
                        message: error.to_string(),
                    });
                }
            }
        }

        Err(last_failure)
    }
}
