use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;

use crate::error::{AppError, AppResult};

/// HTTP client that retries transient failures (timeouts, 429, 5xx) with
/// exponential backoff
pub fn retrying_client(max_retries: u32) -> ClientWithMiddleware {
    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(
            ExponentialBackoff::builder().build_with_max_retries(max_retries),
        ))
        .build()
}

/// Turns a non-success response into an [`AppError::ExternalApi`]
pub async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::ExternalApi(format!(
        "{} API returned status {}: {}",
        provider, status, body
    )))
}
