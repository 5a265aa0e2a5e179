// Request plumbing shared by the platform clients.
use crate::errors::ApiError;
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::time::{Duration, sleep};

const BASE_DELAY: u64 = 500;
const MAX_RETRIES: u32 = 3;

const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,     // 429
    StatusCode::INTERNAL_SERVER_ERROR, // 500
    StatusCode::BAD_GATEWAY,           // 502
    StatusCode::SERVICE_UNAVAILABLE,   // 503
    StatusCode::GATEWAY_TIMEOUT,       // 504
];

pub(crate) fn build_client(
    timeout: Duration,
    user_agent: &str,
) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?)
}

/// Sends the request, retrying throttling and server errors with exponential backoff.
///
/// Any other non-success status is returned as [`ApiError::Status`].
pub(crate) async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let mut retries = 0;

    loop {
        let attempt = request
            .try_clone()
            .ok_or_else(|| ApiError::Decode("request cannot be retried".into()))?;
        let response = attempt.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if RETRIABLE_STATUS_CODES.contains(&status) && retries < MAX_RETRIES {
            let retry_millis = BASE_DELAY * 2_u64.pow(retries);
            tracing::debug!(%status, retry_millis, "Retrying request");
            sleep(Duration::from_millis(retry_millis)).await;
            retries += 1;
            continue;
        }

        return Err(ApiError::Status(status));
    }
}
