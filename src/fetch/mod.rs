pub mod fetcher;
pub mod http_client;
pub mod response;
pub mod retry;

pub use fetcher::{lookup_endpoint, FetchError, RateLimitedFetcher};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use response::{AqiIndex, LookupResponse};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
