use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// POST request envelope passed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json_body(self, body: &serde_json::Value) -> Self {
        let mut request = self.with_header("content-type", "application/json");
        request.body = Some(body.to_string());
        request
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Transport-level failure, split into the one case that is retried locally
/// (the per-attempt timeout) and everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    Timeout(String),
    Transport(String),
}

impl HttpError {
    pub fn message(&self) -> &str {
        match self {
            HttpError::Timeout(message) | HttpError::Transport(message) => message,
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout(_))
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for HttpError {}

/// Transport contract used by the fetcher; one call is one attempt.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("airq-processor/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url);

            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(request.timeout);

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(classify)?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(classify)?;

            Ok(HttpResponse { status, body })
        })
    }
}

fn classify(error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::Timeout(format!("request timeout: {}", error))
    } else if error.is_connect() {
        HttpError::Transport(format!("connection failed: {}", error))
    } else {
        HttpError::Transport(format!("request failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_sets_content_type() {
        let body = serde_json::json!({"location": {"latitude": 1.5, "longitude": 2.5}});
        let request = HttpRequest::post("https://example.test/lookup")
            .with_query("key", "secret")
            .with_json_body(&body);

        assert_eq!(request.url, "https://example.test/lookup");
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.query.get("key").map(String::as_str), Some("secret"));
        assert_eq!(request.body.as_deref(), Some(body.to_string().as_str()));
    }

    #[test]
    fn timeout_errors_are_distinguished() {
        assert!(HttpError::Timeout("slow".to_string()).is_timeout());
        assert!(!HttpError::Transport("refused".to_string()).is_timeout());
        assert_eq!(HttpError::Transport("refused".to_string()).to_string(), "refused");
    }
}
